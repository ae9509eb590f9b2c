use std::future::Future;

use tracing::warn;

use crate::error::Result;

/// Runs `op`; if it fails with a connection error, awaits `reconnect` and
/// runs `op` exactly once more. Any other error, and any error from the
/// second attempt, is returned as is.
pub(crate) async fn retry_on_disconnect<T, Op, OpFut, Re, ReFut>(op: Op, reconnect: Re) -> Result<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = Result<T>>,
    Re: FnOnce() -> ReFut,
    ReFut: Future<Output = Result<()>>,
{
    match op().await {
        Err(e) if e.is_connection_error() => {
            warn!(error = %e, "database connection lost, reconnecting");
            reconnect().await?;
            op().await
        }
        result => result,
    }
}
