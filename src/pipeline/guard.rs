use crate::exception::HttpException;
use crate::pipeline::RequestContext;
use async_trait::async_trait;

/// A pipeline stage that authorizes or rejects a request before the
/// handler runs.
///
/// Guards are evaluated before any interceptor, in scope order
/// (global, then controller, then method). Returning `Ok(false)`
/// short-circuits the pipeline with the default 403 "Forbidden resource"
/// response; throwing a more specific exception propagates it as-is.
///
/// The context is mutable: a guard that authenticates a request writes
/// the resolved principal into the `states` bag, where later stages and
/// [`crate::pipeline::ParamBinding::state`] bindings read it back.
///
/// # Example
/// ```
/// use cadre::pipeline::{Guard, RequestContext};
/// use cadre::exception::HttpException;
/// use cadre::async_trait;
///
/// struct AuthGuard;
///
/// #[async_trait]
/// impl Guard for AuthGuard {
///     async fn can_activate(&self, ctx: &mut RequestContext) -> Result<bool, HttpException> {
///         let Some(key) = ctx.headers.get("x-api-key") else {
///             return Ok(false);
///         };
///         let user = key.to_str().unwrap_or_default().to_string();
///         ctx.set_state("user", serde_json::Value::String(user));
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait Guard: Send + Sync + 'static {
    async fn can_activate(&self, ctx: &mut RequestContext) -> Result<bool, HttpException>;
}
