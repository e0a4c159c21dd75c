//! Periodic auto saves
//!
//! A background thread waits on a stop channel with a timeout equal to the
//! auto-save period. Every timeout is a tick: the shared manager is locked
//! and `auto_save` runs. Stopping sends on the channel and joins the thread,
//! so once `stop` returns no further tick can fire.

use super::manager::SharedSaveManager;
use super::types::SaveError;
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::PoisonError;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives `SaveManager::auto_save` on a timer
pub struct AutoSaveScheduler {
    manager: SharedSaveManager,
    worker: Option<Worker>,
}

impl AutoSaveScheduler {
    pub fn new(manager: SharedSaveManager) -> Self {
        AutoSaveScheduler { manager, worker: None }
    }

    pub fn manager(&self) -> &SharedSaveManager {
        &self.manager
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts the timer if auto saves are enabled in the manager's settings
    ///
    /// Does nothing if the timer is already running. Returns whether the
    /// timer is running afterwards.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return true;
        }

        let (enabled, period) = {
            let manager = self.manager.lock().unwrap_or_else(PoisonError::into_inner);
            let settings = manager.settings();
            (settings.auto_save_enabled, settings.auto_save_period())
        };

        if !enabled {
            debug!("Auto save is disabled, timer not started");
            return false;
        }

        self.start_every(period);
        self.is_running()
    }

    /// Starts the timer with an explicit period, replacing any running timer
    pub fn start_every(&mut self, period: Duration) {
        self.stop();

        let (stop, stop_rx) = mpsc::channel::<()>();
        let manager = SharedSaveManager::clone(&self.manager);

        let spawned = thread::Builder::new()
            .name("auto-save".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => tick(&manager),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => {
                info!("Auto save every {:?}", period);
                self.worker = Some(Worker { stop, handle });
            }
            Err(e) => error!("Couldn't start the auto-save timer: {}", e),
        }
    }

    /// Stops the timer and waits for an in-flight tick to finish
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let _ = worker.stop.send(());
        if worker.handle.join().is_err() {
            error!("Auto-save thread panicked");
        }
        debug!("Auto save timer stopped");
    }

    /// Enables or disables auto saves and restarts the timer to match
    pub fn set_enabled(&mut self, enabled: bool) {
        {
            let mut manager = self.manager.lock().unwrap_or_else(PoisonError::into_inner);
            let settings = manager.settings();
            let (interval, hide) = (settings.auto_save_interval_minutes, settings.hide_auto_save_files);
            manager.set_auto_save(enabled, interval, hide);
        }
        self.restart();
    }

    /// Updates all auto-save settings and restarts the timer to match
    pub fn set_auto_save(&mut self, enabled: bool, interval_minutes: u32, hide_files: bool) {
        self.manager
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_auto_save(enabled, interval_minutes, hide_files);
        self.restart();
    }

    fn restart(&mut self) {
        self.stop();
        self.start();
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tick(manager: &SharedSaveManager) {
    let mut manager = manager.lock().unwrap_or_else(PoisonError::into_inner);

    match manager.auto_save() {
        Ok(path) => debug!("Auto saved to {}", path.display()),
        // Already logged by the manager
        Err(SaveError::NoActiveRecord) => {}
        Err(e) => warn!("Auto save failed: {}", e),
    }
}
