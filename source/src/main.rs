use std::{env, io, str::FromStr, sync::Arc};

use log::info;
use source::{
    ParamSource, SourceState,
    generation::{ConstParamGen, NoiseParamGen, ParamGen, RampParamGen},
};
use tokio::{net::TcpListener, signal};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_TCP_PORT: u16 = 3042;
const DEFAULT_WS_PORT: u16 = 3044;
const DEFAULT_PARAMS: usize = 1_000_000;
const DEFAULT_SEED: u64 = 1234;

/// Reads `key` from the environment, falling back to `default` when unset.
fn var_or<T>(key: &str, default: T) -> io::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid {key} '{value}': {e}"),
            )
        }),
        Err(_) => Ok(default),
    }
}

/// Builds the generator named by `GEN`: `ramp`, `noise` or `const:<value>`.
///
/// # Returns
/// The generator and whether it should be redrawn on every fetch.
fn param_gen(kind: &str, seed: u64) -> io::Result<(Box<dyn ParamGen>, bool)> {
    let invalid = |reason: String| io::Error::new(io::ErrorKind::InvalidInput, reason);

    if let Some(value) = kind.strip_prefix("const:") {
        let value: f64 = value
            .parse()
            .map_err(|e| invalid(format!("invalid GEN '{kind}': {e}")))?;

        let generator: Box<dyn ParamGen> = Box::new(ConstParamGen::new(value));
        return Ok((generator, false));
    }

    let generator: Box<dyn ParamGen> = match kind {
        "ramp" => Box::new(RampParamGen),
        "noise" => Box::new(NoiseParamGen::new(seed)),
        _ => {
            return Err(invalid(format!(
                "unknown GEN '{kind}', expected ramp, noise or const:<value>"
            )));
        }
    };

    Ok((generator, kind == "noise"))
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let tcp_port = var_or("TCP_PORT", DEFAULT_TCP_PORT)?;
    let ws_port = var_or("WS_PORT", DEFAULT_WS_PORT)?;
    let params = var_or("PARAMS", DEFAULT_PARAMS)?;
    let seed = var_or("SEED", DEFAULT_SEED)?;
    let kind = env::var("GEN").unwrap_or_else(|_| "ramp".to_string());

    let (generator, refresh) = param_gen(&kind, seed)?;
    let state = SourceState::new(params, generator).with_refresh_on_fetch(refresh);
    info!("serving {params} parameters from a {kind} generator");

    let tcp = TcpListener::bind((host.as_str(), tcp_port)).await?;
    info!("listening for tcp workers at {}", tcp.local_addr()?);
    let ws = TcpListener::bind((host.as_str(), ws_port)).await?;
    info!("listening for websocket workers at {}", ws.local_addr()?);

    let mut source = ParamSource::new(Arc::new(state));

    tokio::select! {
        ret = source.serve(Some(tcp), Some(ws)) => ret?,
        _ = signal::ctrl_c() => info!("received ctrl-c"),
    }

    Ok(())
}
