//! Common test utilities

#![allow(dead_code, unreachable_pub)]

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use nfc_sdk::{
    CardHandle, Disposition, Protocol, Protocols, ReaderState, ResourceManager, ShareMode, State,
    StopHandle,
};

/// Call made by the controller into the resource manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    IsValid,
    ListReaders,
    /// Current states passed to the wait, per reader
    Wait(Vec<(String, State)>),
    Connect(String, ShareMode, Protocols),
    Disconnect(String, Disposition),
    Cancel,
    Release,
}

/// Scripted outcome of one wait call
#[derive(Debug, Clone)]
pub enum WaitStep {
    /// Report these event states
    Change(Vec<(&'static str, State)>),
    /// Fail the wait
    Fail(pcsc::Error),
    /// Stop the run, then fail the wait as a torn down context would
    Stop(StopHandle, pcsc::Error),
}

#[derive(Debug, Default)]
struct Script {
    readers: Vec<String>,
    list_error: Option<pcsc::Error>,
    valid: VecDeque<Result<(), pcsc::Error>>,
    waits: VecDeque<WaitStep>,
    connects: VecDeque<Result<(), pcsc::Error>>,
    disconnects: VecDeque<Result<(), pcsc::Error>>,
    cancel_error: Option<pcsc::Error>,
    stop_before_wait: Option<StopHandle>,
    calls: Vec<Call>,
    cancelled: bool,
    released: bool,
    parked: bool,
}

/// Scripted [`ResourceManager`] recording every call
///
/// Once the scripted waits are used up, a wait blocks until `cancel`.
#[derive(Debug, Clone, Default)]
pub struct MockManager {
    shared: Arc<(Mutex<Script>, Condvar)>,
}

impl MockManager {
    pub fn with_readers(readers: &[&str]) -> Self {
        let mock = Self::default();
        mock.script().readers = readers.iter().map(|r| r.to_string()).collect();
        mock
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.shared.0.lock().unwrap()
    }

    pub fn fail_list(&self, err: pcsc::Error) -> &Self {
        self.script().list_error = Some(err);
        self
    }

    /// Queue an `is_valid` result; once exhausted every check succeeds
    pub fn push_valid(&self, result: Result<(), pcsc::Error>) -> &Self {
        self.script().valid.push_back(result);
        self
    }

    pub fn push_wait(&self, step: WaitStep) -> &Self {
        self.script().waits.push_back(step);
        self
    }

    pub fn push_connect(&self, result: Result<(), pcsc::Error>) -> &Self {
        self.script().connects.push_back(result);
        self
    }

    pub fn push_disconnect(&self, result: Result<(), pcsc::Error>) -> &Self {
        self.script().disconnects.push_back(result);
        self
    }

    pub fn fail_cancel(&self, err: pcsc::Error) -> &Self {
        self.script().cancel_error = Some(err);
        self
    }

    /// On the next wait, stop the run and let disposal finish before the
    /// wait is entered
    pub fn stop_before_wait(&self, stop: StopHandle) -> &Self {
        self.script().stop_before_wait = Some(stop);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.script().calls.iter().filter(|c| f(c)).count()
    }

    pub fn waits(&self) -> Vec<Vec<(String, State)>> {
        self.script()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Wait(states) => Some(states.clone()),
                _ => None,
            })
            .collect()
    }

    /// Block until a wait call is parked with nothing left to report
    pub fn wait_until_parked(&self) {
        let (lock, cvar) = &*self.shared;
        let guard = lock.lock().unwrap();
        let (_guard, timeout) = cvar
            .wait_timeout_while(guard, Duration::from_secs(5), |s| !s.parked)
            .unwrap();
        assert!(!timeout.timed_out(), "event loop never blocked in wait");
    }
}

impl ResourceManager for MockManager {
    type Card = MockCard;

    fn is_valid(&self) -> Result<(), pcsc::Error> {
        let mut script = self.script();
        script.calls.push(Call::IsValid);
        if script.released {
            return Err(pcsc::Error::InvalidHandle);
        }
        script.valid.pop_front().unwrap_or(Ok(()))
    }

    fn list_readers(&self) -> Result<Vec<String>, pcsc::Error> {
        let mut script = self.script();
        script.calls.push(Call::ListReaders);
        match script.list_error {
            Some(err) => Err(err),
            None => Ok(script.readers.clone()),
        }
    }

    fn wait_for_change(
        &self,
        states: &mut [ReaderState],
        _timeout: Option<Duration>,
    ) -> Result<(), pcsc::Error> {
        let (lock, cvar) = &*self.shared;
        let mut script = lock.lock().unwrap();
        if let Some(stop) = script.stop_before_wait.take() {
            drop(script);
            stop.stop();
            script = cvar
                .wait_while(lock.lock().unwrap(), |s| !s.released)
                .unwrap();
        }
        script.calls.push(Call::Wait(
            states
                .iter()
                .map(|s| (s.reader().to_string(), s.current_state()))
                .collect(),
        ));

        if script.cancelled {
            return Err(pcsc::Error::Cancelled);
        }

        match script.waits.pop_front() {
            Some(WaitStep::Change(changes)) => {
                for state in states.iter_mut() {
                    let event = changes
                        .iter()
                        .find(|(name, _)| *name == state.reader())
                        .map_or(state.current_state(), |(_, event)| *event);
                    state.set_event_state(event);
                }
                Ok(())
            }
            Some(WaitStep::Fail(err)) => Err(err),
            Some(WaitStep::Stop(stop, err)) => {
                stop.stop();
                Err(err)
            }
            None => {
                script.parked = true;
                cvar.notify_all();
                let mut script = cvar.wait_while(script, |s| !s.cancelled).unwrap();
                script.parked = false;
                Err(pcsc::Error::Cancelled)
            }
        }
    }

    fn connect(
        &self,
        reader: &str,
        share_mode: ShareMode,
        protocols: Protocols,
    ) -> Result<Self::Card, pcsc::Error> {
        let mut script = self.script();
        script
            .calls
            .push(Call::Connect(reader.to_string(), share_mode, protocols));
        script.connects.pop_front().unwrap_or(Ok(()))?;
        Ok(MockCard {
            reader: reader.to_string(),
            manager: self.clone(),
        })
    }

    fn cancel(&self) -> Result<(), pcsc::Error> {
        let (lock, cvar) = &*self.shared;
        let mut script = lock.lock().unwrap();
        script.calls.push(Call::Cancel);
        if let Some(err) = script.cancel_error {
            return Err(err);
        }
        script.cancelled = true;
        cvar.notify_all();
        Ok(())
    }

    fn release(&self) -> Result<(), pcsc::Error> {
        let (lock, cvar) = &*self.shared;
        let mut script = lock.lock().unwrap();
        script.calls.push(Call::Release);
        if script.released {
            return Err(pcsc::Error::InvalidHandle);
        }
        script.released = true;
        cvar.notify_all();
        Ok(())
    }
}

/// Card handle produced by [`MockManager::connect`]
#[derive(Debug)]
pub struct MockCard {
    reader: String,
    manager: MockManager,
}

impl CardHandle for MockCard {
    fn protocol(&self) -> Option<Protocol> {
        Some(Protocol::T1)
    }

    fn disconnect(self, disposition: Disposition) -> Result<(), pcsc::Error> {
        let mut script = self.manager.script();
        script.calls.push(Call::Disconnect(self.reader, disposition));
        script.disconnects.pop_front().unwrap_or(Ok(()))
    }
}

/// Present card as reported after an insertion
pub const PRESENT: State = State::CHANGED.union(State::PRESENT);

/// Empty reader as reported after a removal
pub const EMPTY: State = State::CHANGED.union(State::EMPTY);
