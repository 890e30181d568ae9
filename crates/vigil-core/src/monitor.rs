//! The security monitor: the serialized state machine behind every boundary
//! call.
//!
//! All mutable state (status, trigger set, sensing flag, watchdog, step-up
//! gate, and the ledger tip) sits behind one `Mutex`. Each operation:
//!
//!   lock → read clock → decide → mutate → Ledger::append → save snapshot → unlock → notify
//!
//! Notifications are queued while the lock is held and delivered only after
//! it is released, so a slow or failing notifier can neither stall other
//! callers nor undo a transition.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use vigil_config::{CauseCatalog, MonitorConfig};
use vigil_contracts::{
    cause::{CauseSet, TriggerCause, KEY_ZEROIZED, STEP_UP_LOCKOUT},
    error::{VigilError, VigilResult},
    ledger::{LedgerEntry, VerifyReport},
    notify::{AlertSettings, Notification},
    posture::CompliancePosture,
    status::{ApplianceDirective, BootId, ReportedStatus, SecuritySnapshot, SecurityStatus, StatusReport},
};
use vigil_ledger::{DurableStore, Ledger, LedgerOptions};

use crate::{
    stepup::{StepUpApproval, StepUpGate, StepUpRejection},
    traits::{Clock, CodeGenerator, Notifier, RandomCodeGenerator, SystemClock},
    watchdog::{LivenessOutcome, Watchdog},
};

/// Acknowledgement of a transition that appended a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionAck {
    /// Stored status after the transition.
    pub status: SecurityStatus,
    pub triggers: Vec<String>,
    /// The ledger entry that records the transition.
    pub entry: LedgerEntry,
    /// Set when the transition is in memory but a durable write failed.
    pub persistence_warning: Option<String>,
}

impl TransitionAck {
    pub fn is_durable(&self) -> bool {
        self.persistence_warning.is_none()
    }
}

/// Outcome of `report_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDisposition {
    Recorded(TransitionAck),
    /// Sensing is disabled (maintenance); nothing was recorded.
    Ignored,
}

/// Outcome of `record_liveness`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessAck {
    Recorded,
    /// The liveness cause was the only thing holding the lockdown.
    Recovered(TransitionAck),
}

/// Where a freshly issued step-up code was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepUpTicket {
    /// `None` when no alert recipient is configured; the code was issued
    /// but cannot be delivered.
    pub delivered_to: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// External dependencies of a monitor.
pub struct Collaborators {
    pub store: Arc<dyn DurableStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub codes: Box<dyn CodeGenerator>,
}

impl Collaborators {
    /// System clock and OS-random step-up codes.
    pub fn new(store: Arc<dyn DurableStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            codes: Box::new(RandomCodeGenerator),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_codes(mut self, codes: Box<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }
}

struct MonitorState {
    status: SecurityStatus,
    triggers: CauseSet,
    sensing_enabled: bool,
    zeroized: bool,
    boot_id: BootId,
    watchdog: Watchdog,
    gate: StepUpGate,
    ledger: Ledger,
    alerts: AlertSettings,
}

impl MonitorState {
    fn snapshot(&self) -> SecuritySnapshot {
        SecuritySnapshot {
            status: self.status,
            triggers: self.triggers.clone(),
            sensing_enabled: self.sensing_enabled,
            zeroized: self.zeroized,
            last_liveness_at: self.watchdog.last_liveness_at(),
            boot_at: self.watchdog.boot_at(),
            boot_id: self.boot_id,
        }
    }
}

/// The appliance security monitor.
///
/// Callers share one handle (`Arc<SecurityMonitor>` or a borrowed
/// reference across scoped threads); every method takes `&self`.
pub struct SecurityMonitor {
    state: Mutex<MonitorState>,
    store: Arc<dyn DurableStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    catalog: CauseCatalog,
    config: MonitorConfig,
}

impl SecurityMonitor {
    /// Open a monitor over `collaborators.store`.
    ///
    /// A stored snapshot is restored (a lockdown survives restart) with a
    /// fresh boot window; otherwise the appliance starts SAFE and armed.
    /// Alert settings fall back to `config.alerts.recipient` when none are
    /// stored.
    pub fn open(config: MonitorConfig, collaborators: Collaborators) -> VigilResult<Self> {
        config.validate()?;

        let Collaborators {
            store,
            notifier,
            clock,
            codes,
        } = collaborators;

        let offset = config.ledger.offset().ok_or_else(|| VigilError::ConfigError {
            reason: format!("utc_offset_minutes {} is out of range", config.ledger.utc_offset_minutes),
        })?;
        let ledger = Ledger::open(
            store.clone(),
            LedgerOptions {
                capacity: config.ledger.retention(),
                offset,
            },
        )?;

        let now = clock.now();
        let snapshot = match store.load_state()? {
            Some(persisted) => SecuritySnapshot::restore(persisted, now),
            None => SecuritySnapshot::fresh(now),
        };
        let alerts = store.load_settings()?.unwrap_or_else(|| AlertSettings {
            recipient: config.alerts.recipient.clone(),
        });

        info!(
            status = %snapshot.status,
            triggers = ?snapshot.triggers.names(),
            sensing_enabled = snapshot.sensing_enabled,
            entries = ledger.len(),
            boot_id = %snapshot.boot_id,
            "security monitor opened"
        );

        let state = MonitorState {
            status: snapshot.status,
            triggers: snapshot.triggers,
            sensing_enabled: snapshot.sensing_enabled,
            zeroized: snapshot.zeroized,
            boot_id: snapshot.boot_id,
            watchdog: Watchdog::new(&config.watchdog, snapshot.boot_at, snapshot.last_liveness_at),
            gate: StepUpGate::new(&config.step_up, codes),
            ledger,
            alerts,
        };

        Ok(Self {
            state: Mutex::new(state),
            store,
            notifier,
            clock,
            catalog: CauseCatalog::from_config(&config.causes),
            config,
        })
    }

    // ── Sensor and heartbeat inputs ──────────────────────────────────────────

    /// Record a sensor event.
    ///
    /// A `Locked` report adds `name` to the trigger set (set semantics) and
    /// locks the appliance. A `Safe` report is recorded in the ledger only.
    /// While sensing is disabled the report is dropped and `Ignored`
    /// returned. Tamper causes are checked against the catalog before any
    /// state is touched.
    pub fn report_event(&self, name: &str, reported: ReportedStatus) -> VigilResult<EventDisposition> {
        let cause = match reported {
            ReportedStatus::Locked => Some(self.catalog.admit(name)?),
            ReportedStatus::Safe if name.trim().is_empty() => {
                return Err(VigilError::InvalidReport {
                    reason: "event name must not be empty".to_string(),
                });
            }
            ReportedStatus::Safe => None,
        };

        let mut outbox = Vec::new();
        let disposition = {
            let mut state = self.lock()?;
            if !state.sensing_enabled {
                debug!(event = %name, status = %reported.as_str(), "sensing disabled, event ignored");
                return Ok(EventDisposition::Ignored);
            }
            let now = self.clock.now();

            match cause {
                Some(cause) => {
                    let ack = self.lock_down(&mut state, cause, now);
                    self.queue(
                        &state,
                        &mut outbox,
                        "SYSTEM LOCKED",
                        format!(
                            "Tamper event {} reported at {}. The appliance is LOCKED. Active causes: {}.",
                            name,
                            ack.entry.time,
                            ack.triggers.join(", ")
                        ),
                    );
                    EventDisposition::Recorded(ack)
                }
                None => {
                    let ack = self.commit(&mut state, name, ReportedStatus::Safe.as_str(), now);
                    debug!(event = %name, sequence = ack.entry.sequence, "informational event recorded");
                    EventDisposition::Recorded(ack)
                }
            }
        };

        self.dispatch(outbox);
        Ok(disposition)
    }

    /// Accept a liveness signal from the appliance.
    ///
    /// Auto-recovers only when `DEVICE_DISCONNECTED` is the sole active
    /// cause: to SAFE, or back to MAINTENANCE when sensing is disabled.
    pub fn record_liveness(&self) -> VigilResult<LivenessAck> {
        let mut outbox = Vec::new();
        let ack = {
            let mut state = self.lock()?;
            let now = self.clock.now();
            let status = state.status;
            let outcome = {
                let MonitorState { watchdog, triggers, .. } = &mut *state;
                watchdog.record_liveness(now, status, triggers)
            };

            match outcome {
                LivenessOutcome::Recorded => {
                    debug!(at = %now, "liveness recorded");
                    LivenessAck::Recorded
                }
                LivenessOutcome::Recovered => {
                    // A lock raised during maintenance recovers back into
                    // maintenance; SAFE always means sensing is armed.
                    let recovered = if state.sensing_enabled {
                        SecurityStatus::Safe
                    } else {
                        SecurityStatus::Maintenance
                    };
                    state.triggers.clear();
                    state.status = recovered;
                    state.zeroized = false;
                    let ack = self.commit(&mut state, "AUTO_RECOVERED", recovered.as_str(), now);
                    info!(
                        sequence = ack.entry.sequence,
                        status = %recovered,
                        "liveness restored, auto-recovered"
                    );
                    self.queue(
                        &state,
                        &mut outbox,
                        "DEVICE RECONNECTED",
                        format!(
                            "Liveness resumed at {}. The appliance auto-recovered to {}.",
                            ack.entry.time,
                            recovered.as_str()
                        ),
                    );
                    LivenessAck::Recovered(ack)
                }
            }
        };

        self.dispatch(outbox);
        Ok(ack)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Current status, evaluating the watchdog as a side effect.
    ///
    /// Silence past the timeout outside the grace window locks the
    /// appliance with `DEVICE_DISCONNECTED` and zeroizes. Silence inside
    /// the grace window is reported as `Offline` without being stored.
    pub fn query_status(&self) -> VigilResult<StatusReport> {
        let mut outbox = Vec::new();
        let report = {
            let mut state = self.lock()?;
            let now = self.clock.now();

            if let Some(cause) = state.watchdog.check_liveness(now, state.status) {
                let silent_for = now - state.watchdog.last_liveness_at();
                state.zeroized = true;
                let ack = self.lock_down(&mut state, cause, now);
                warn!(
                    silent_secs = silent_for.num_seconds(),
                    sequence = ack.entry.sequence,
                    "liveness lost, appliance locked"
                );
                self.queue(
                    &state,
                    &mut outbox,
                    "CRITICAL: DEVICE DISCONNECTED",
                    format!(
                        "No liveness signal for {}s (timeout {}s). The appliance is LOCKED and keys are zeroized.",
                        silent_for.num_seconds(),
                        self.config.watchdog.timeout_secs
                    ),
                );
            }

            let displayed = if state.status == SecurityStatus::Safe
                && state.watchdog.is_silent(now)
                && state.watchdog.in_grace_period(now)
            {
                SecurityStatus::Offline
            } else {
                state.status
            };

            StatusReport {
                status: displayed,
                locked: state.status == SecurityStatus::Locked,
                triggers: state.triggers.names(),
                boot_id: state.boot_id,
                checked_at: now,
            }
        };

        self.dispatch(outbox);
        Ok(report)
    }

    /// Up to `limit` ledger entries, newest first.
    pub fn list_ledger(&self, limit: Option<usize>) -> VigilResult<Vec<LedgerEntry>> {
        Ok(self.lock()?.ledger.list(limit))
    }

    /// Verify the stored ledger. A broken chain is a finding in the report.
    pub fn verify_ledger(&self) -> VigilResult<VerifyReport> {
        self.lock()?.ledger.verify()
    }

    pub fn snapshot(&self) -> VigilResult<SecuritySnapshot> {
        Ok(self.lock()?.snapshot())
    }

    /// What the physical appliance should do right now.
    pub fn appliance_directive(&self) -> VigilResult<ApplianceDirective> {
        Ok(ApplianceDirective::from(&self.lock()?.snapshot()))
    }

    /// Time since the current boot window opened.
    pub fn uptime(&self) -> VigilResult<Duration> {
        let boot_at = self.lock()?.watchdog.boot_at();
        Ok(self.clock.now() - boot_at)
    }

    pub fn posture(&self) -> VigilResult<CompliancePosture> {
        Ok(CompliancePosture::evaluate(&self.lock()?.snapshot()))
    }

    // ── Step-up ──────────────────────────────────────────────────────────────

    /// Issue a step-up code and send it to the alert recipient.
    ///
    /// Any outstanding code is invalidated. Delivery failure does not undo
    /// issuance.
    pub fn request_step_up(&self) -> VigilResult<StepUpTicket> {
        let mut outbox = Vec::new();
        let ticket = {
            let mut state = self.lock()?;
            let now = self.clock.now();
            let issued = state.gate.issue(now);
            let delivered_to = state.alerts.recipient.clone().filter(|_| state.alerts.is_configured());
            if delivered_to.is_none() {
                warn!("step-up code issued but no alert recipient is configured");
            }
            self.queue(
                &state,
                &mut outbox,
                "OTP Verification",
                format!(
                    "Your verification code is {}. It expires at {}.",
                    issued.code, issued.expires_at
                ),
            );
            StepUpTicket {
                delivered_to,
                expires_at: issued.expires_at,
            }
        };

        self.dispatch(outbox);
        Ok(ticket)
    }

    /// Verify a step-up code.
    ///
    /// Reaching the failure threshold discards the code and locks the
    /// appliance with `STEP_UP_LOCKOUT`, whatever action was being
    /// authorized; the caller then sees `InvalidCode { locked: true }`.
    pub fn confirm_step_up(&self, code: &str) -> VigilResult<StepUpApproval> {
        let mut outbox = Vec::new();
        let result = {
            let mut state = self.lock()?;
            let now = self.clock.now();

            match state.gate.verify(code, now) {
                Ok(approval) => Ok(approval),
                Err(StepUpRejection::NoActiveCode) => Err(VigilError::NoActiveCode),
                Err(StepUpRejection::Invalid { failures }) => Err(VigilError::InvalidCode {
                    failures,
                    locked: false,
                }),
                Err(StepUpRejection::Exhausted { failures }) => {
                    state.zeroized = true;
                    let ack = self.lock_down(&mut state, TriggerCause::new(STEP_UP_LOCKOUT), now);
                    warn!(failures, sequence = ack.entry.sequence, "step-up brute force, appliance locked");
                    self.queue(
                        &state,
                        &mut outbox,
                        "SECURITY LOCKDOWN",
                        format!(
                            "{} consecutive invalid verification codes. The appliance is LOCKED and requires an administrative reset.",
                            failures
                        ),
                    );
                    Err(VigilError::InvalidCode { failures, locked: true })
                }
            }
        };

        self.dispatch(outbox);
        result
    }

    // ── Administrative transitions ───────────────────────────────────────────

    /// Clear every trigger and return to SAFE with sensing armed.
    ///
    /// Opens a new boot window: the grace period restarts and a new
    /// `BootId` is minted.
    pub fn reset(&self, approval: StepUpApproval) -> VigilResult<TransitionAck> {
        let mut outbox = Vec::new();
        let ack = {
            let mut state = self.lock()?;
            let now = self.clock.now();
            let cleared = state.triggers.names();

            state.triggers.clear();
            state.status = SecurityStatus::Safe;
            state.sensing_enabled = true;
            state.zeroized = false;
            state.watchdog.rearm(now);
            state.boot_id = BootId::new();

            let ack = self.commit(&mut state, "SYSTEM_RESET", SecurityStatus::Safe.as_str(), now);
            info!(
                cleared = ?cleared,
                approved_at = %approval.approved_at(),
                boot_id = %state.boot_id,
                "system reset"
            );
            self.queue(
                &state,
                &mut outbox,
                "System Reset",
                format!("The appliance was reset to SAFE at {}.", ack.entry.time),
            );
            ack
        };

        self.dispatch(outbox);
        Ok(ack)
    }

    /// Enter maintenance: sensing off, status MAINTENANCE.
    pub fn deactivate(&self, approval: Option<StepUpApproval>) -> VigilResult<TransitionAck> {
        self.require_approval("deactivate", self.config.step_up.required_for_maintenance, approval)?;

        let mut outbox = Vec::new();
        let ack = {
            let mut state = self.lock()?;
            reject_while_locked(&state, "deactivate")?;
            let now = self.clock.now();

            state.sensing_enabled = false;
            state.status = SecurityStatus::Maintenance;
            let ack = self.commit(&mut state, "MAINTENANCE_MODE", SecurityStatus::Maintenance.as_str(), now);
            info!(sequence = ack.entry.sequence, "maintenance mode entered, sensing disabled");
            self.queue(
                &state,
                &mut outbox,
                "Maintenance Mode",
                format!("Tamper sensing was disabled for maintenance at {}.", ack.entry.time),
            );
            ack
        };

        self.dispatch(outbox);
        Ok(ack)
    }

    /// Leave maintenance: sensing on, status SAFE.
    pub fn reactivate(&self, approval: Option<StepUpApproval>) -> VigilResult<TransitionAck> {
        self.require_approval("reactivate", self.config.step_up.required_for_reactivate, approval)?;

        let mut outbox = Vec::new();
        let ack = {
            let mut state = self.lock()?;
            reject_while_locked(&state, "reactivate")?;
            let now = self.clock.now();

            state.sensing_enabled = true;
            state.status = SecurityStatus::Safe;
            let ack = self.commit(&mut state, "SYSTEM_ARMED", SecurityStatus::Safe.as_str(), now);
            info!(sequence = ack.entry.sequence, "sensing re-armed");
            self.queue(
                &state,
                &mut outbox,
                "System Armed",
                format!("Tamper sensing was re-armed at {}.", ack.entry.time),
            );
            ack
        };

        self.dispatch(outbox);
        Ok(ack)
    }

    /// Lock with an administrator-supplied cause.
    pub fn force_lock(&self, cause: &str) -> VigilResult<TransitionAck> {
        let cause = self.catalog.admit(cause)?;

        let mut outbox = Vec::new();
        let ack = {
            let mut state = self.lock()?;
            let now = self.clock.now();
            let ack = self.lock_down(&mut state, cause, now);
            self.queue(
                &state,
                &mut outbox,
                "SYSTEM LOCKED",
                format!(
                    "The appliance was locked by an administrator at {}. Active causes: {}.",
                    ack.entry.time,
                    ack.triggers.join(", ")
                ),
            );
            ack
        };

        self.dispatch(outbox);
        Ok(ack)
    }

    /// Destroy key material: lock with `KEY_ZEROIZED` and raise the
    /// zeroized flag until the next reset.
    pub fn zeroize(&self) -> VigilResult<TransitionAck> {
        let mut outbox = Vec::new();
        let ack = {
            let mut state = self.lock()?;
            let now = self.clock.now();
            state.zeroized = true;
            let ack = self.lock_down(&mut state, TriggerCause::new(KEY_ZEROIZED), now);
            warn!(sequence = ack.entry.sequence, "keys zeroized on administrator request");
            self.queue(
                &state,
                &mut outbox,
                "CRITICAL: KEYS ZEROIZED",
                format!("Key material was zeroized at {}. The appliance is LOCKED.", ack.entry.time),
            );
            ack
        };

        self.dispatch(outbox);
        Ok(ack)
    }

    // ── Alert routing ────────────────────────────────────────────────────────

    pub fn alert_settings(&self) -> VigilResult<AlertSettings> {
        Ok(self.lock()?.alerts.clone())
    }

    /// Store new alert settings, then confirm to the new recipient.
    ///
    /// Settings are written durably before they take effect; a failed write
    /// leaves the old settings in place.
    pub fn update_alert_settings(&self, settings: AlertSettings) -> VigilResult<()> {
        if settings.recipient.is_some() && !settings.is_configured() {
            return Err(VigilError::ConfigError {
                reason: "alert recipient must not be blank".to_string(),
            });
        }

        let mut outbox = Vec::new();
        {
            let mut state = self.lock()?;
            self.store.save_settings(&settings)?;
            state.alerts = settings;
            info!(recipient = ?state.alerts.recipient, "alert settings updated");
            self.queue(
                &state,
                &mut outbox,
                "System Configured",
                "This address will now receive security alerts and verification codes.".to_string(),
            );
        }

        self.dispatch(outbox);
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn lock(&self) -> VigilResult<MutexGuard<'_, MonitorState>> {
        self.state.lock().map_err(|e| VigilError::StateLockPoisoned {
            reason: e.to_string(),
        })
    }

    fn require_approval(&self, action: &str, required: bool, approval: Option<StepUpApproval>) -> VigilResult<()> {
        match approval {
            Some(approval) => {
                debug!(action, approved_at = %approval.approved_at(), "step-up approval consumed");
                Ok(())
            }
            None if required => {
                warn!(action, "relaxing transition attempted without step-up approval");
                Err(VigilError::StepUpRequired {
                    action: action.to_string(),
                })
            }
            None => Ok(()),
        }
    }

    /// Add `cause`, set LOCKED, and record the cause in the ledger.
    fn lock_down(&self, state: &mut MonitorState, cause: TriggerCause, now: DateTime<Utc>) -> TransitionAck {
        let newly_added = state.triggers.add(cause.clone());
        state.status = SecurityStatus::Locked;
        let ack = self.commit(state, cause.as_str(), SecurityStatus::Locked.as_str(), now);
        warn!(
            cause = %cause,
            newly_added,
            active = state.triggers.len(),
            sequence = ack.entry.sequence,
            "appliance LOCKED"
        );
        ack
    }

    /// Append the ledger entry for a transition already applied to `state`,
    /// then save the snapshot. Write failures become a warning on the ack.
    fn commit(&self, state: &mut MonitorState, event: &str, label: &str, now: DateTime<Utc>) -> TransitionAck {
        let receipt = state.ledger.append(event, label, now);

        let mut warnings = Vec::new();
        if let Some(err) = &receipt.persist_error {
            warnings.push(err.to_string());
        }
        if let Err(err) = self.store.save_state(&state.snapshot().to_persisted(now)) {
            warn!(event, error = %err, "state snapshot not persisted");
            warnings.push(err.to_string());
        }

        TransitionAck {
            status: state.status,
            triggers: state.triggers.names(),
            entry: receipt.entry,
            persistence_warning: if warnings.is_empty() {
                None
            } else {
                Some(warnings.join("; "))
            },
        }
    }

    fn queue(&self, state: &MonitorState, outbox: &mut Vec<Notification>, subject: &str, body: String) {
        let Some(recipient) = state.alerts.recipient.as_ref().filter(|_| state.alerts.is_configured()) else {
            debug!(subject, "no alert recipient configured, notification dropped");
            return;
        };
        let prefix = self.config.alerts.subject_prefix.trim();
        let subject = if prefix.is_empty() {
            subject.to_string()
        } else {
            format!("{} {}", prefix, subject)
        };
        outbox.push(Notification {
            subject,
            body,
            recipient: recipient.clone(),
        });
    }

    /// Deliver queued notifications. Must be called without the lock held.
    fn dispatch(&self, outbox: Vec<Notification>) {
        for notification in outbox {
            if let Err(err) = self.notifier.notify(&notification) {
                warn!(
                    subject = %notification.subject,
                    recipient = %notification.recipient,
                    error = %err,
                    "notification delivery failed"
                );
            }
        }
    }
}

fn reject_while_locked(state: &MonitorState, action: &str) -> VigilResult<()> {
    if state.status == SecurityStatus::Locked {
        warn!(action, triggers = ?state.triggers.names(), "transition rejected while LOCKED");
        return Err(VigilError::InvalidTransition {
            from: SecurityStatus::Locked.to_string(),
            action: action.to_string(),
        });
    }
    Ok(())
}
