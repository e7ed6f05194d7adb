use std::{
    collections::VecDeque,
    net,
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use comms::{CodecErr, Params, msg::Msg};
use tokio::{io, net::TcpListener};
use worker::{Scheme, WorkerErr, WorkerOptions};

/// How a test double answers the requests of its single connection.
#[derive(Default)]
struct Script {
    params: Vec<f64>,
    signals: VecDeque<&'static [u8]>,
    close_after: Option<usize>,
    wrong_reply_at: Option<usize>,
    silent: bool,
}

impl Script {
    fn serving(params: &[f64]) -> Self {
        Self {
            params: params.to_vec(),
            ..Default::default()
        }
    }
}

struct Double {
    uri: String,
    returns: mpsc::Receiver<f64>,
    handle: thread::JoinHandle<io::Result<()>>,
}

/// Runs a scripted parameter source on its own thread and runtime.
fn spawn_double(script: Script) -> Double {
    let listener = net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let uri = format!("tcp://{}", listener.local_addr().unwrap());

    let (returns_tx, returns) = mpsc::channel();
    let handle = thread::spawn(move || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(serve(listener, script, returns_tx))
    });

    Double {
        uri,
        returns,
        handle,
    }
}

async fn serve(
    listener: net::TcpListener,
    mut script: Script,
    returns: mpsc::Sender<f64>,
) -> io::Result<()> {
    let listener = TcpListener::from_std(listener)?;
    let (stream, _) = listener.accept().await?;
    let (rx, tx) = stream.into_split();
    let (mut rx, mut tx) = comms::channel(rx, tx);

    let mut rx_buf = Vec::new();
    let mut served = 0;

    loop {
        if script.close_after == Some(served) {
            return Ok(());
        }

        let msg = match rx.recv_into::<Msg>(&mut rx_buf).await {
            Ok(msg) => msg,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        served += 1;

        if script.silent {
            continue;
        }

        if script.wrong_reply_at == Some(served) {
            tx.send(&Msg::SignalResponse(None)).await?;
            continue;
        }

        match msg {
            Msg::FetchRequest => {
                let params = Params::from_values(&script.params);
                tx.send(&Msg::FetchResponse(params)).await?;
            }
            Msg::ReturnsRequest(value) => {
                let _ = returns.send(value);
            }
            Msg::SignalPoll => {
                let signal = script.signals.pop_front();
                tx.send(&Msg::SignalResponse(signal)).await?;
            }
            other => panic!("unexpected request {other:?}"),
        }
    }
}

#[test]
fn fetches_the_fixed_buffer() {
    let double = spawn_double(Script::serving(&[1.0, 2.0, 3.0]));
    let worker = worker::create_worker(&double.uri).unwrap();

    assert_eq!(worker.endpoint().scheme(), Scheme::Tcp);
    assert_eq!(worker.get_parameters().unwrap(), [1.0, 2.0, 3.0]);
    assert_eq!(worker.get_parameters().unwrap().into_vec(), vec![1.0, 2.0, 3.0]);

    drop(worker);
    double.handle.join().unwrap().unwrap();
}

#[test]
fn empty_buffer_is_a_valid_snapshot() {
    let double = spawn_double(Script::serving(&[]));
    let worker = worker::create_worker(&double.uri).unwrap();

    assert!(worker.get_parameters().unwrap().is_empty());
}

#[test]
fn third_call_after_remote_closes_is_connection_lost() {
    let double = spawn_double(Script {
        close_after: Some(2),
        ..Script::serving(&[1.0, 2.0, 3.0])
    });
    let worker = worker::create_worker(&double.uri).unwrap();

    assert_eq!(worker.get_parameters().unwrap(), [1.0, 2.0, 3.0]);
    assert_eq!(worker.get_parameters().unwrap(), [1.0, 2.0, 3.0]);
    double.handle.join().unwrap().unwrap();

    let err = worker.get_parameters().unwrap_err();
    assert!(matches!(err, WorkerErr::ConnectionLost { .. }), "{err}");
    assert!(worker.is_closed());

    // Sticky, no silent reconnect.
    let err = worker.get_parameters().unwrap_err();
    assert!(matches!(err, WorkerErr::ConnectionLost { .. }), "{err}");
    let err = worker.get_signal().unwrap_err();
    assert!(matches!(err, WorkerErr::ConnectionLost { .. }), "{err}");
}

#[test]
fn no_signal_answers_immediately() {
    let double = spawn_double(Script {
        signals: VecDeque::from([b"stop".as_slice()]),
        ..Default::default()
    });
    let worker = worker::create_worker(&double.uri).unwrap();

    let signal = worker.get_signal().unwrap().unwrap();
    assert_eq!(signal.as_str(), Some("stop"));

    let start = Instant::now();
    assert_eq!(worker.get_signal().unwrap(), None);
    assert!(start.elapsed() < Duration::from_millis(10));
}

#[test]
fn returns_reach_the_remote_in_order() {
    let double = spawn_double(Script::serving(&[0.5]));
    let worker = worker::create_worker(&double.uri).unwrap();

    worker.send_returns(1.0).unwrap();
    worker.send_returns(-2.5).unwrap();
    // The fetch round trip orders after both returns.
    worker.get_parameters().unwrap();

    let got: Vec<f64> = double.returns.try_iter().collect();
    assert_eq!(got, [1.0, -2.5]);
}

#[test]
fn wrong_reply_keeps_the_connection() {
    let double = spawn_double(Script {
        wrong_reply_at: Some(1),
        ..Script::serving(&[1.0, 2.0, 3.0])
    });
    let worker = worker::create_worker(&double.uri).unwrap();

    let mut dst = vec![9.0];
    let err = worker.get_parameters_into(&mut dst).unwrap_err();
    assert!(
        matches!(
            err,
            WorkerErr::Codec(CodecErr::UnexpectedMessage {
                expected: "fetch_response",
                got: "signal_response",
            })
        ),
        "{err}"
    );
    assert_eq!(dst, [9.0]);
    assert!(!worker.is_closed());

    worker.get_parameters_into(&mut dst).unwrap();
    assert_eq!(dst, [1.0, 2.0, 3.0]);
}

#[test]
fn oversized_response_closes_the_connection() {
    let double = spawn_double(Script::serving(&[1.0, 2.0, 3.0]));
    let options = WorkerOptions::default().with_max_frame_len(8);
    let worker = worker::create_worker_with(&double.uri, options).unwrap();

    let err = worker.get_parameters().unwrap_err();
    assert!(
        matches!(err, WorkerErr::Codec(CodecErr::FrameTooLarge { max: 8, .. })),
        "{err}"
    );
    assert!(worker.is_closed());
    assert!(matches!(
        worker.get_parameters().unwrap_err(),
        WorkerErr::ConnectionLost { .. }
    ));
}

#[test]
fn silent_remote_times_out_and_closes() {
    let double = spawn_double(Script {
        silent: true,
        ..Default::default()
    });
    let options = WorkerOptions::default().with_call_timeout(Duration::from_millis(50));
    let worker = worker::create_worker_with(&double.uri, options).unwrap();

    let err = worker.get_parameters().unwrap_err();
    assert!(matches!(err, WorkerErr::Timeout { .. }), "{err}");
    assert!(matches!(
        worker.get_parameters().unwrap_err(),
        WorkerErr::ConnectionLost { .. }
    ));

    // The dropped session closed the socket.
    double.handle.join().unwrap().unwrap();
}

#[test]
fn close_is_idempotent_and_sticky() {
    let double = spawn_double(Script::serving(&[1.0]));
    let worker = worker::create_worker(&double.uri).unwrap();

    worker.close();
    worker.close();
    assert!(worker.is_closed());

    let err = worker.send_returns(1.0).unwrap_err();
    assert!(matches!(err, WorkerErr::ConnectionLost { .. }), "{err}");
    double.handle.join().unwrap().unwrap();
}

#[test]
fn dropping_an_open_worker_hangs_up_cleanly() {
    let double = spawn_double(Script::serving(&[1.0]));
    let worker = worker::create_worker(&double.uri).unwrap();

    worker.get_parameters().unwrap();
    drop(worker);

    double.handle.join().unwrap().unwrap();
}

#[test]
fn closing_an_open_worker_hangs_up_cleanly() {
    let double = spawn_double(Script::serving(&[1.0]));
    let worker = worker::create_worker(&double.uri).unwrap();

    worker.send_returns(0.5).unwrap();
    worker.close();

    double.handle.join().unwrap().unwrap();
    assert_eq!(double.returns.recv().unwrap(), 0.5);
    assert!(worker.is_closed());
}

#[test]
fn dropping_inside_a_runtime_skips_the_graceful_close() {
    let double = spawn_double(Script::serving(&[1.0]));
    let worker = worker::create_worker(&double.uri).unwrap();
    worker.get_parameters().unwrap();

    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(async move { drop(worker) });

    // The socket still closed with the session.
    double.handle.join().unwrap().unwrap();
}

#[test]
fn debug_shows_the_endpoint_and_state() {
    let double = spawn_double(Script::serving(&[]));
    let worker = worker::create_worker(&double.uri).unwrap();

    let open = format!("{worker:?}");
    assert!(open.contains(double.uri.as_str()), "{open}");
    assert!(open.contains("closed: false"), "{open}");

    worker.close();
    assert!(format!("{worker:?}").contains("closed: true"));
}

#[test]
fn concurrent_calls_are_serialized() {
    const THREADS: usize = 4;
    const CALLS: usize = 50;

    let values: Vec<f64> = (0..1024).map(|i| i as f64).collect();
    let double = spawn_double(Script::serving(&values));
    let worker = Arc::new(worker::create_worker(&double.uri).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let worker = Arc::clone(&worker);
            let values = values.clone();
            thread::spawn(move || {
                let mut dst = Vec::new();
                for _ in 0..CALLS {
                    worker.get_parameters_into(&mut dst).unwrap();
                    assert_eq!(dst, values);
                    assert_eq!(worker.get_signal().unwrap(), None);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn invalid_uri_is_rejected_before_connecting() {
    let err = worker::create_worker("udp://127.0.0.1:3043").unwrap_err();
    assert!(matches!(err, WorkerErr::InvalidEndpoint { .. }), "{err}");
}

#[test]
fn refused_connection_is_a_connect_error() {
    let listener = net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = worker::create_worker(&format!("tcp://{addr}")).unwrap_err();
    assert!(matches!(err, WorkerErr::Connect { .. }), "{err}");
}
