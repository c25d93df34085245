use chrono::Local;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::scheduler::{BackgroundFetchResult, NotificationScheduler};
use crate::config::NotificationsConfig;

/// Owns the foreground and background notification loops.
///
/// `start()` runs one pass straight away (the foreground transition), then
/// checks for due notifications every foreground tick and resynchronises on
/// every background interval. `stop()` signals both loops and waits for them;
/// a pass already running is allowed to finish.
pub struct NotificationService {
    scheduler: Arc<NotificationScheduler>,
    foreground_tick: Duration,
    background_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl NotificationService {
    pub fn new(scheduler: Arc<NotificationScheduler>, config: &NotificationsConfig) -> Self {
        Self::with_intervals(
            scheduler,
            config.foreground_tick(),
            config.background_interval(),
        )
    }

    pub fn with_intervals(
        scheduler: Arc<NotificationScheduler>,
        foreground_tick: Duration,
        background_interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            scheduler,
            foreground_tick,
            background_interval,
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn start(&mut self) {
        if self.is_running() {
            warn!("notification service already running");
            return;
        }
        let _ = self.shutdown_tx.send(false);
        info!(
            "starting notification service (tick {:?}, background {:?})",
            self.foreground_tick, self.background_interval
        );
        self.handles.push(self.spawn_foreground());
        self.handles.push(self.spawn_background());
    }

    pub async fn stop(&mut self) {
        info!("stopping notification service");
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("notification task panicked: {}", e);
            }
        }
    }

    fn spawn_foreground(&self) -> JoinHandle<()> {
        let scheduler = Arc::clone(&self.scheduler);
        let mut shutdown_rx = self.shutdown_rx.clone();
        let tick = self.foreground_tick;

        tokio::spawn(async move {
            if let Err(e) = scheduler.sync().await {
                error!("foreground notification pass failed: {:#}", e);
            }

            let mut interval = tokio::time::interval(tick);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = Local::now().naive_local();
                        match scheduler.notifier().deliver_due(now).await {
                            // Something fired, so line up the following prayer.
                            Ok(delivered) if delivered > 0 => {
                                if let Err(e) = scheduler.sync().await {
                                    error!("notification pass after delivery failed: {:#}", e);
                                }
                            }
                            Ok(_) => {}
                            Err(e) => error!("delivering notifications failed: {:#}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn spawn_background(&self) -> JoinHandle<()> {
        let scheduler = Arc::clone(&self.scheduler);
        let mut shutdown_rx = self.shutdown_rx.clone();
        let every = self.background_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // Skip the first immediate tick; the foreground pass covers it.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let result = scheduler.sync().await;
                        let fetch = BackgroundFetchResult::from(&result);
                        match result {
                            Ok(_) => info!("background notification pass: {:?}", fetch),
                            Err(e) => error!("background notification pass failed: {:#}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}
