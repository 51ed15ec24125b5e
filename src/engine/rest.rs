//! Campfire rest: entered on morale depletion, left on a deadline clock.

use serde_json::json;
use std::time::Instant;

use crate::api::{ApiClient, ApiError, Endpoint};

/// Acknowledge entry into the resting state with the server.
pub async fn start_rest(api: &mut ApiClient) -> Result<(), ApiError> {
    api.request(Endpoint::StartRest, Some(json!({}))).await?;
    Ok(())
}

/// The rest is over once the deadline has passed. The explicit end-rest
/// endpoint exists for voluntary early termination and is not driven here.
pub fn rest_finished(now: Instant, rest_end: Instant) -> bool {
    now >= rest_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::REST_DURATION;
    use std::time::Duration;

    #[test]
    fn rest_holds_until_the_deadline() {
        let t0 = Instant::now();
        let end = t0 + REST_DURATION;
        assert!(!rest_finished(t0, end));
        assert!(!rest_finished(end - Duration::from_millis(100), end));
        assert!(rest_finished(end, end));
        assert!(rest_finished(end + Duration::from_secs(1), end));
    }
}
