use async_trait::async_trait;

use crate::{domain::ChatId, Result};

/// What the CI server said about a trigger request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// HTTP 200, 201 or 202.
    Accepted { status: u16 },
    /// Any other HTTP status, with the response body.
    Rejected { status: u16, body: String },
}

impl TriggerOutcome {
    pub fn from_status(status: u16, body: String) -> Self {
        if matches!(status, 200 | 201 | 202) {
            Self::Accepted { status }
        } else {
            Self::Rejected { status, body }
        }
    }
}

/// Port for starting the remote build job.
///
/// `Err` means the request never produced an HTTP response (DNS, TLS,
/// connection reset, ...).
#[async_trait]
pub trait BuildTrigger: Send + Sync {
    async fn trigger(&self, chat_id: ChatId) -> Result<TriggerOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_201_202_are_accepted() {
        for status in [200, 201, 202] {
            assert_eq!(
                TriggerOutcome::from_status(status, String::new()),
                TriggerOutcome::Accepted { status }
            );
        }
        assert_eq!(
            TriggerOutcome::from_status(204, String::new()),
            TriggerOutcome::Rejected {
                status: 204,
                body: String::new()
            }
        );
        assert_eq!(
            TriggerOutcome::from_status(500, "boom".to_string()),
            TriggerOutcome::Rejected {
                status: 500,
                body: "boom".to_string()
            }
        );
    }
}
