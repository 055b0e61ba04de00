//! Tokio event loop for one context.
//!
//! [`SessionRuntime`] owns the controller, the activity bridge and a
//! [`TokioScheduler`]. Timer firings and [`SessionCommand`]s are handled one
//! at a time, so each transition runs to completion before the next begins.
//! Events the controller emits are forwarded on an unbounded channel for the
//! UI to render.
//!
//! ```ignore
//! let (runtime, handle, mut events) = SessionRuntime::new(&config, store, logout)?;
//! tokio::spawn(runtime.run());
//! handle.input("keydown");
//! while let Some(event) = events.recv().await { render(event) }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::activity::ActivityBridge;
use crate::clock::{Clock, RuntimeClock};
use crate::error::Result;
use crate::events::SessionEvent;
use crate::session::{IdleSessionController, LogoutAction, SessionParts, SessionState};
use crate::storage::{IdleLogoutConfig, SharedStore};
use crate::timer::{TimerTag, TokioScheduler};

/// Requests a [`SessionHandle`] sends to the runtime.
#[derive(Debug)]
pub enum SessionCommand {
    /// Raw input event by name; goes through the activity bridge.
    Input { name: String },
    /// Activity now, bypassing the bridge.
    Activity,
    /// Dismiss the countdown.
    Cancel,
    Start,
    /// Stop the controller and end the loop.
    Stop,
    Snapshot(oneshot::Sender<SessionEvent>),
}

/// Cloneable sender side of a running session.
///
/// Send methods return `false` once the runtime has exited.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn input(&self, name: impl Into<String>) -> bool {
        self.send(SessionCommand::Input { name: name.into() })
    }

    pub fn activity(&self) -> bool {
        self.send(SessionCommand::Activity)
    }

    pub fn cancel(&self) -> bool {
        self.send(SessionCommand::Cancel)
    }

    pub fn start(&self) -> bool {
        self.send(SessionCommand::Start)
    }

    pub fn stop(&self) -> bool {
        self.send(SessionCommand::Stop)
    }

    /// Current state, or `None` if the runtime has exited.
    pub async fn snapshot(&self) -> Option<SessionEvent> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionCommand::Snapshot(reply)) {
            return None;
        }
        rx.await.ok()
    }

    fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

enum Step {
    Timer(TimerTag),
    Command(Option<SessionCommand>),
}

pub struct SessionRuntime {
    controller: IdleSessionController,
    bridge: ActivityBridge,
    clock: Arc<dyn Clock>,
    autostart: bool,
    fired: mpsc::UnboundedReceiver<TimerTag>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionRuntime {
    /// Build the runtime, its command handle and the event receiver.
    pub fn new(
        config: &IdleLogoutConfig,
        store: Box<dyn SharedStore>,
        logout: Box<dyn LogoutAction>,
    ) -> Result<(Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>)> {
        let clock: Arc<dyn Clock> = Arc::new(RuntimeClock::new());
        let (timers, fired) = TokioScheduler::new();
        let controller = IdleSessionController::new(
            config,
            SessionParts {
                clock: Arc::clone(&clock),
                store,
                timers: Box::new(timers),
                logout,
            },
        )?;

        let (command_tx, commands) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let runtime = Self {
            controller,
            bridge: ActivityBridge::new(&config.activity),
            clock,
            autostart: config.autostart,
            fired,
            commands,
            events,
        };
        Ok((runtime, SessionHandle { commands: command_tx }, event_rx))
    }

    /// Process timer firings and commands until logout, `Stop`, or every
    /// handle is dropped. A failed logout action is returned as the error.
    pub async fn run(mut self) -> Result<()> {
        if self.autostart {
            self.controller.start();
        }

        loop {
            let step = tokio::select! {
                Some(tag) = self.fired.recv() => Step::Timer(tag),
                command = self.commands.recv() => Step::Command(command),
            };

            match step {
                Step::Timer(tag) => {
                    let event = self.controller.handle(tag.into_trigger())?;
                    self.emit(event);
                }
                Step::Command(None) => {
                    info!("All session handles dropped, stopping");
                    self.controller.stop();
                    break;
                }
                Step::Command(Some(SessionCommand::Stop)) => {
                    let event = self.controller.stop();
                    self.emit(event);
                    break;
                }
                Step::Command(Some(command)) => self.dispatch(command)?,
            }

            if self.controller.state() == SessionState::LoggedOut {
                break;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, command: SessionCommand) -> Result<()> {
        let event = match command {
            SessionCommand::Input { name } => {
                let now = self.clock.now_ms();
                self.bridge.forward(&mut self.controller, &name, now)?
            }
            SessionCommand::Activity => self.controller.record_activity()?,
            SessionCommand::Cancel => self.controller.request_cancel()?,
            SessionCommand::Start => {
                self.controller.start();
                None
            }
            SessionCommand::Stop => self.controller.stop(),
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.controller.snapshot());
                None
            }
        };
        self.emit(event);
        Ok(())
    }

    fn emit(&self, event: Option<SessionEvent>) {
        let Some(event) = event else { return };
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}
