//! Bridging the async clients onto the synchronous issuer traits.

use std::future::Future;

use blockcert_issuer::IssuerError;

use crate::error::ServiceError;

/// Run `future` to completion from synchronous code.
///
/// Inside a multi-threaded runtime (or on one of its blocking threads) the
/// current handle is used; otherwise a runtime is created for the call.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, ServiceError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(tokio::task::block_in_place(|| handle.block_on(future))),
        Err(_) => {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| ServiceError::Runtime(e.to_string()))?;
            Ok(rt.block_on(future))
        }
    }
}

/// Run a client call and report failures as collaborator errors.
pub(crate) fn call_sync<T, F>(operation: &str, future: F) -> Result<T, IssuerError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    block_on(future)
        .and_then(|result| result)
        .map_err(|e| {
            tracing::error!(operation, error = %e, "service call failed");
            e.into_issuer(operation)
        })
}
