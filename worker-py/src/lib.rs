//! Python bindings for the worker client, exposed as the `fdlib` module.
//!
//! ```python
//! import fdlib
//!
//! worker = fdlib.create_worker("tcp://127.0.0.1:3042")
//! params = worker.get_parameters()  # numpy.ndarray of float64
//! worker.send_returns(1.0)
//! signal = worker.get_signal()  # bytes or None
//! ```
//!
//! Every call releases the GIL while it waits on the network.

use numpy::PyArray1;
use pyo3::{
    create_exception,
    exceptions::{PyConnectionError, PyException, PyValueError},
    prelude::*,
    types::PyBytes,
};
use worker::{WorkerErr, WorkerOptions};

create_exception!(fdlib, ConnectError, PyConnectionError);
create_exception!(fdlib, ConnectionLost, PyConnectionError);
create_exception!(fdlib, TimeoutError, pyo3::exceptions::PyTimeoutError);
create_exception!(fdlib, CodecError, PyException);

/// Maps a worker failure onto the matching Python exception.
fn into_py_err(e: WorkerErr) -> PyErr {
    let msg = e.to_string();
    match e {
        WorkerErr::InvalidEndpoint { .. } => PyValueError::new_err(msg),
        WorkerErr::Connect { .. } => ConnectError::new_err(msg),
        WorkerErr::ConnectionLost { .. } => ConnectionLost::new_err(msg),
        WorkerErr::Timeout { .. } => TimeoutError::new_err(msg),
        WorkerErr::Codec(_) => CodecError::new_err(msg),
    }
}

fn describe(worker: &worker::Worker) -> String {
    let state = if worker.is_closed() { "closed" } else { "open" };
    format!("<fdlib.Worker {} ({state})>", worker.endpoint())
}

/// A connection to a remote parameter source.
#[pyclass(frozen, module = "fdlib")]
struct Worker {
    inner: worker::Worker,
}

#[pymethods]
impl Worker {
    /// Fetches the current parameter snapshot as a one dimensional `float64` array.
    ///
    /// The received values move into the array without another copy.
    fn get_parameters<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let params = py
            .detach(|| self.inner.get_parameters())
            .map_err(into_py_err)?;

        Ok(PyArray1::from_vec(py, params.into_vec()))
    }

    /// Reports a scalar return, no acknowledgement is awaited.
    fn send_returns(&self, py: Python<'_>, value: f64) -> PyResult<()> {
        py.detach(|| self.inner.send_returns(value))
            .map_err(into_py_err)
    }

    /// Polls for a pending signal, `None` when there is none.
    fn get_signal<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyBytes>>> {
        let signal = py
            .detach(|| self.inner.get_signal())
            .map_err(into_py_err)?;

        Ok(signal.map(|signal| PyBytes::new(py, signal.as_bytes())))
    }

    /// Closes the connection, later calls raise `ConnectionLost`.
    fn close(&self, py: Python<'_>) {
        py.detach(|| self.inner.close());
    }

    #[getter]
    fn closed(&self) -> bool {
        self.inner.is_closed()
    }

    #[getter]
    fn endpoint(&self) -> String {
        self.inner.endpoint().to_string()
    }

    fn __repr__(&self) -> String {
        describe(&self.inner)
    }
}

/// Connects a new worker to `uri`.
///
/// `options` is an optional json object with the connection settings, e.g.
/// `{"call_timeout": 500}`.
#[pyfunction]
#[pyo3(signature = (uri, options = None))]
fn create_worker(py: Python<'_>, uri: &str, options: Option<&str>) -> PyResult<Worker> {
    let options = match options {
        Some(json) => {
            WorkerOptions::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?
        }
        None => WorkerOptions::default(),
    };

    let inner = py
        .detach(|| worker::create_worker_with(uri, options))
        .map_err(into_py_err)?;

    log::debug!("python worker connected to {}", inner.endpoint());
    Ok(Worker { inner })
}

#[pymodule]
fn fdlib(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();

    m.add_function(wrap_pyfunction!(create_worker, m)?)?;
    m.add_class::<Worker>()?;

    m.add("ConnectError", py.get_type::<ConnectError>())?;
    m.add("ConnectionLost", py.get_type::<ConnectionLost>())?;
    m.add("TimeoutError", py.get_type::<TimeoutError>())?;
    m.add("CodecError", py.get_type::<CodecError>())?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
