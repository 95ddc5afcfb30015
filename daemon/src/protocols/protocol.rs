use sysmon_protocol::v1::action::{ToolRequest, ToolResponse};

pub trait Protocol {
    fn process_text_request(&self, raw: &str) -> Result<ToolRequest, ToolResponse>;

    /// One serialized response per request, `None` when nothing should be sent.
    async fn process_text(&self, raw: &str) -> Option<String>;

    fn handle_text_rate_limit_exceed(&self, raw: &str) -> Option<String>;
}
