use super::Drivers;

#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Serves until the shared stop signal fires or the transport closes.
    async fn run(&self) -> anyhow::Result<()>;

    fn get_driver_type(&self) -> Drivers;
}
