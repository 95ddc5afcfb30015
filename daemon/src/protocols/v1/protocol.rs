use super::super::Protocol;
use super::ProtocolV1Config;
use crate::tools::ToolRegistry;
use log::{error, warn};
use std::sync::Arc;
use sysmon_protocol::v1::action::retcode::{self, Retcode};
use sysmon_protocol::v1::action::status::ActionStatus;
use sysmon_protocol::v1::action::{ToolRequest, ToolResponse, ToolResults};
use sysmon_protocol::{ToolError, ToolErrorKind};
use tokio::sync::Semaphore;
use uuid::Uuid;

pub struct ProtocolV1 {
    registry: Arc<ToolRegistry>,
    // running + waiting
    admission: Semaphore,
    // running
    workers: Semaphore,
}

impl Protocol for ProtocolV1 {
    fn process_text_request(&self, raw: &str) -> Result<ToolRequest, ToolResponse> {
        serde_json::from_str::<ToolRequest>(raw).map_err(|err| {
            warn!("malformed request: {}", err);
            Self::bad_request(&err.to_string())
        })
    }

    async fn process_text(&self, raw: &str) -> Option<String> {
        let Ok(_ticket) = self.admission.try_acquire() else {
            return self.handle_text_rate_limit_exceed(raw);
        };
        let response = match self.process_text_request(raw) {
            Ok(request) => self.invoke(request).await,
            Err(response) => response,
        };
        Self::encode(&response)
    }

    fn handle_text_rate_limit_exceed(&self, raw: &str) -> Option<String> {
        let response = match self.process_text_request(raw) {
            Ok(request) => Self::rate_limited(request.id),
            Err(response) => response,
        };
        Self::encode(&response)
    }
}

impl ProtocolV1 {
    pub fn new(registry: Arc<ToolRegistry>, config: &ProtocolV1Config) -> Self {
        let parallel = usize::from(config.max_parallel_requests.max(1));
        let pending = usize::from(config.max_pending_requests);
        Self {
            registry,
            admission: Semaphore::new(parallel + pending),
            workers: Semaphore::new(parallel),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Entry point for transports that decode the envelope themselves.
    pub async fn handle(&self, request: ToolRequest) -> ToolResponse {
        match self.admission.try_acquire() {
            Ok(_ticket) => self.invoke(request).await,
            Err(_) => Self::rate_limited(request.id),
        }
    }

    async fn invoke(&self, request: ToolRequest) -> ToolResponse {
        let Ok(_worker) = self.workers.acquire().await else {
            error!("worker semaphore closed");
            return Self::err_with(
                retcode::UNEXPECTED_ERROR.clone(),
                ToolErrorKind::ProviderUnavailable,
                request.id,
            );
        };

        match self.registry.dispatch(&request.tool, &request.args).await {
            Ok(data) => Self::ok(data, request.id),
            Err(err) => {
                warn!("tool `{}` failed ({:?}): {}", request.tool, err.kind(), err);
                Self::err(&err, request.id)
            }
        }
    }

    fn encode(response: &ToolResponse) -> Option<String> {
        serde_json::to_string(response)
            .map_err(|err| error!("could not encode response {}: {}", response.id, err))
            .ok()
    }

    /// The envelope itself could not be decoded, so there is no id to echo.
    pub fn bad_request(detail: &str) -> ToolResponse {
        Self::err_with(
            retcode::BAD_REQUEST.with_message(detail),
            ToolErrorKind::InvalidArgument,
            Uuid::nil(),
        )
    }

    fn rate_limited(id: Uuid) -> ToolResponse {
        Self::err_with(
            retcode::RATE_LIMIT_EXCEEDED.clone(),
            ToolErrorKind::ProviderUnavailable,
            id,
        )
    }

    pub fn err(error: &ToolError, id: Uuid) -> ToolResponse {
        Self::err_with(error.retcode(), error.kind(), id)
    }

    fn err_with(retcode: Retcode, kind: ToolErrorKind, id: Uuid) -> ToolResponse {
        ToolResponse {
            status: ActionStatus::Error,
            data: ToolResults::Failure { kind },
            retcode,
            id,
        }
    }

    fn ok(data: ToolResults, id: Uuid) -> ToolResponse {
        ToolResponse {
            status: ActionStatus::Ok,
            data,
            retcode: retcode::OK.clone(),
            id,
        }
    }
}
