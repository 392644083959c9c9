use std::future::Future;

use crate::driver::{Driver, Handle};
use crate::error::Result;

/// Run `body` with resolution focus inside the embedded document hosted by
/// `frame`, restoring the top-level document on every exit path.
///
/// `body` is not polled until focus has switched, so lookups inside it
/// resolve against the frame. When both the body and the restore fail, the
/// body's error wins; a restore failure alone still surfaces.
pub async fn with_frame<T, Fut>(driver: &dyn Driver, frame: &dyn Handle, body: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    frame.enter_frame().await?;
    let outcome = body.await;
    let restored = driver.switch_to_default().await;
    let value = outcome?;
    restored?;
    Ok(value)
}
