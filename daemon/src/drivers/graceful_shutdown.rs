use log::{debug, error, info, warn};
use tokio::task::JoinSet;

use super::driver::Driver;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct GracefulShutdown {
    drivers: Vec<Arc<dyn Driver>>,
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl GracefulShutdown {
    pub fn new() -> Self {
        Self { drivers: vec![] }
    }
}

impl GracefulShutdown {
    pub fn add_driver(&mut self, driver: Box<dyn Driver>) {
        self.drivers.push(Arc::from(driver));
    }

    /// Runs every driver until all of them return. Ctrl-C cancels `stop_token`
    /// so drivers wind down; a driver that finishes on its own (stdin closed)
    /// cancels it too, taking the others with it. A second Ctrl-C aborts the
    /// drivers that are still draining.
    pub async fn watch(mut self, stop_token: CancellationToken) {
        let mut join_set = JoinSet::new();
        for driver in self.drivers.drain(..) {
            join_set.spawn(async move {
                let kind = driver.get_driver_type();
                (kind, driver.run().await)
            });
        }

        debug!("graceful shutdown start watching");
        let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());
        loop {
            tokio::select! {
                finished = join_set.join_next() => match finished {
                    Some(Ok((kind, result))) => {
                        match result {
                            Ok(()) => info!("{:?} driver stopped", kind),
                            Err(err) => error!("{:?} driver failed: {:#}", kind, err),
                        }
                        stop_token.cancel();
                    }
                    Some(Err(err)) if err.is_cancelled() => debug!("driver task aborted"),
                    Some(Err(err)) => {
                        error!("driver task panicked: {}", err);
                        stop_token.cancel();
                    }
                    None => break,
                },
                signal = &mut ctrl_c => {
                    if let Err(err) = signal {
                        error!("can't listen for ctrl+c: {}", err);
                        ctrl_c.set(tokio::signal::ctrl_c());
                        continue;
                    }
                    if stop_token.is_cancelled() {
                        warn!("second ctrl+c, aborting remaining drivers");
                        join_set.abort_all();
                    } else {
                        info!("ctrl+c received, stopping drivers");
                        stop_token.cancel();
                    }
                    ctrl_c.set(tokio::signal::ctrl_c());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::Drivers;

    struct OneShot;

    #[async_trait::async_trait]
    impl Driver for OneShot {
        async fn run(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn get_driver_type(&self) -> Drivers {
            Drivers::Stdio
        }
    }

    struct UntilStopped {
        stop_token: CancellationToken,
        // simulates a driver busy writing when the stop fires
        busy: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl Driver for UntilStopped {
        async fn run(&self) -> anyhow::Result<()> {
            tokio::time::sleep(self.busy).await;
            self.stop_token.cancelled().await;
            Ok(())
        }

        fn get_driver_type(&self) -> Drivers {
            Drivers::Websocket
        }
    }

    #[tokio::test]
    async fn finished_driver_stops_the_others() {
        let stop_token = CancellationToken::new();
        let mut gs = GracefulShutdown::new();
        gs.add_driver(Box::new(UntilStopped {
            stop_token: stop_token.clone(),
            busy: std::time::Duration::from_millis(50),
        }));
        gs.add_driver(Box::new(OneShot));

        tokio::time::timeout(std::time::Duration::from_secs(5), gs.watch(stop_token.clone()))
            .await
            .unwrap();
        assert!(stop_token.is_cancelled());
    }
}
