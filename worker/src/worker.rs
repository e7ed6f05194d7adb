use std::{fmt, mem, time::Duration};

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::{
    runtime::{Builder, Handle, Runtime},
    time,
};

use crate::{
    buffer::ParameterBuffer,
    config::WorkerOptions,
    endpoint::Endpoint,
    error::{Result, WorkerErr},
    session::Session,
    signal::Signal,
};

/// How long dropping an open worker waits for a graceful close.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

enum State {
    Open(Session),
    Closed(String),
}

/// A blocking client bound to one parameter source.
///
/// Every call performs a full round trip on the calling thread. Calls from
/// several threads are queued and run one at a time, never interleaved on the
/// connection. Once the connection is lost every later call fails with
/// `WorkerErr::ConnectionLost`, the worker never reconnects by itself.
///
/// The blocking calls must not be made from within an async runtime.
pub struct Worker {
    endpoint: Endpoint,
    options: WorkerOptions,
    runtime: Option<Runtime>,
    state: Mutex<State>,
}

impl Worker {
    /// Connects to `endpoint`, handshakes included.
    ///
    /// # Arguments
    /// * `endpoint` - Where the parameter source listens.
    /// * `options` - Connection and call settings.
    ///
    /// # Returns
    /// A connected worker or `WorkerErr::Connect`.
    pub fn connect(endpoint: Endpoint, options: WorkerOptions) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| WorkerErr::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let session = runtime.block_on(Session::open(&endpoint, &options))?;
        info!("worker connected to {endpoint}");

        Ok(Self {
            endpoint,
            options,
            runtime: Some(runtime),
            state: Mutex::new(State::Open(session)),
        })
    }

    /// Fetches the remote's current parameter snapshot.
    ///
    /// # Returns
    /// The snapshot, or an error if the round trip failed.
    pub fn get_parameters(&self) -> Result<ParameterBuffer> {
        let mut values = Vec::new();
        self.get_parameters_into(&mut values)?;
        Ok(values.into())
    }

    /// Fetches the remote's current parameter snapshot into a caller owned buffer.
    ///
    /// Reusing `dst` across calls avoids allocating once its capacity settles.
    /// On failure `dst` is left as it was.
    ///
    /// # Arguments
    /// * `dst` - Replaced with the received values.
    pub fn get_parameters_into(&self, dst: &mut Vec<f64>) -> Result<()> {
        self.call("get_parameters", async |session: &mut Session| {
            session.fetch_parameters_into(dst).await
        })
    }

    /// Reports a scalar return to the remote.
    ///
    /// Returns once the request is written, no acknowledgement is awaited.
    pub fn send_returns(&self, value: f64) -> Result<()> {
        self.call("send_returns", async |session: &mut Session| {
            session.send_returns(value).await
        })
    }

    /// Polls the remote for an out of band signal.
    ///
    /// # Returns
    /// The pending signal, or `None` if there is none.
    pub fn get_signal(&self) -> Result<Option<Signal>> {
        self.call("get_signal", async |session: &mut Session| {
            session.poll_signal().await
        })
    }

    /// Closes the connection, later calls fail with `WorkerErr::ConnectionLost`.
    ///
    /// Closing an already closed worker does nothing.
    pub fn close(&self) {
        let state = mem::replace(
            &mut *self.state.lock(),
            State::Closed("worker closed by the caller".to_string()),
        );

        if let State::Open(session) = state {
            self.shutdown(session);
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), State::Closed(_))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    /// Runs `f` against the open session, holding the lock for the whole round trip.
    ///
    /// Errors that leave the stream in an unknown position close the session.
    fn call<T>(
        &self,
        op: &'static str,
        f: impl AsyncFnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();

        let session = match &mut *state {
            State::Open(session) => session,
            State::Closed(detail) => {
                return Err(WorkerErr::ConnectionLost {
                    detail: detail.clone(),
                });
            }
        };

        let Some(runtime) = &self.runtime else {
            return Err(WorkerErr::lost("worker runtime shut down"));
        };

        let ret = runtime.block_on(async {
            match self.options.call_timeout {
                Some(after) => match time::timeout(after, f(session)).await {
                    Ok(ret) => ret,
                    Err(_) => Err(WorkerErr::Timeout { after }),
                },
                None => f(session).await,
            }
        });

        if let Err(e) = &ret {
            if e.closes_session() {
                warn!("{op} failed, closing the connection to {}: {e}", self.endpoint);
                *state = State::Closed(e.to_string());
            } else {
                debug!("{op} failed: {e}");
            }
        }

        ret
    }

    fn shutdown(&self, mut session: Session) {
        // Blocking on the runtime would panic inside another one, the socket
        // still closes when the session drops.
        if Handle::try_current().is_ok() {
            return;
        }

        let Some(runtime) = &self.runtime else {
            return;
        };

        match runtime.block_on(async { time::timeout(CLOSE_GRACE, session.close()).await }) {
            Ok(Ok(())) => info!("worker disconnected from {}", self.endpoint),
            Ok(Err(e)) => debug!("closing {} failed: {e}", self.endpoint),
            Err(_) => debug!("closing {} timed out", self.endpoint),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let state = mem::replace(
            self.state.get_mut(),
            State::Closed("worker dropped".to_string()),
        );

        // A runtime can't be dropped, nor blocked on, inside another one.
        if Handle::try_current().is_ok() {
            drop(state);
            if let Some(runtime) = self.runtime.take() {
                runtime.shutdown_background();
            }
            return;
        }

        if let State::Open(session) = state {
            self.shutdown(session);
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("endpoint", &self.endpoint.to_string())
            .field("closed", &self.is_closed())
            .finish()
    }
}
