use std::sync::Arc;

use comms::{Deserialize, msg::Msg};
use futures::{SinkExt, StreamExt};
use source::{ParamSource, SourceState, generation::RampParamGen};
use tokio::{
    io,
    net::{TcpListener, TcpStream},
};
use tokio_tungstenite::tungstenite::Message;

async fn start(len: usize) -> io::Result<(Arc<SourceState>, String, String)> {
    let state = Arc::new(SourceState::new(len, Box::new(RampParamGen)));
    let tcp = TcpListener::bind("127.0.0.1:0").await?;
    let ws = TcpListener::bind("127.0.0.1:0").await?;
    let tcp_addr = tcp.local_addr()?.to_string();
    let ws_addr = ws.local_addr()?.to_string();

    let mut source = ParamSource::new(Arc::clone(&state));
    tokio::spawn(async move { source.serve(Some(tcp), Some(ws)).await });

    Ok((state, tcp_addr, ws_addr))
}

#[tokio::test]
async fn tcp_workers_share_one_snapshot() -> io::Result<()> {
    let (state, tcp_addr, _) = start(1000).await?;
    let expected: Vec<f64> = (0..1000).map(|i| i as f64).collect();

    for _ in 0..3 {
        let stream = TcpStream::connect(&tcp_addr).await?;
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);

        tx.send(&Msg::FetchRequest).await?;
        let mut buf = Vec::new();
        let Msg::FetchResponse(params) = rx.recv_into::<Msg>(&mut buf).await? else {
            panic!("expected a fetch response");
        };
        assert_eq!(params.to_vec(), expected);
    }

    assert_eq!(state.fetches(), 3);
    Ok(())
}

#[tokio::test]
async fn websocket_frames_carry_the_length_prefix() -> io::Result<()> {
    let (state, _, ws_addr) = start(3).await?;
    state.push_signal("halt");

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{ws_addr}/some/job"))
        .await
        .map_err(io::Error::other)?;

    let mut frame = Vec::new();
    comms::encode_frame(&Msg::SignalPoll, &mut frame)?;
    ws.send(Message::Binary(frame)).await.map_err(io::Error::other)?;

    let Some(Ok(Message::Binary(reply))) = ws.next().await else {
        panic!("expected a binary reply");
    };
    let body = comms::frame_body(&reply)?;
    assert_eq!(
        Msg::deserialize(body)?,
        Msg::SignalResponse(Some(b"halt".as_slice()))
    );

    let mut frame = Vec::new();
    comms::encode_frame(&Msg::FetchRequest, &mut frame)?;
    ws.send(Message::Binary(frame)).await.map_err(io::Error::other)?;

    let Some(Ok(Message::Binary(reply))) = ws.next().await else {
        panic!("expected a binary reply");
    };
    let Msg::FetchResponse(params) = Msg::deserialize(comms::frame_body(&reply)?)? else {
        panic!("expected a fetch response");
    };
    assert_eq!(params.to_vec(), [0., 1., 2.]);
    Ok(())
}
