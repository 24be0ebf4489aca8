//! Scripted device doubles for unit tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{
    NavflowError, Result,
    common::Params,
    device::{CapabilityChannel, ChannelOutput, VerificationBackend, VerificationOutput},
    model::{ActionType, Verification},
};

/// `command` or `command:key` when the call carries a `key` param.
fn describe(
    command: &str,
    params: &Params,
) -> String {
    match params.get_str("key") {
        Some(key) => format!("{}:{}", command, key),
        None => command.to_string(),
    }
}

pub(crate) struct ScriptedChannel {
    kind: ActionType,
    calls: Mutex<Vec<String>>,
    failing: Vec<String>,
    faulting: Vec<String>,
    fail_at_call: Option<usize>,
}

impl ScriptedChannel {
    pub(crate) fn new(kind: ActionType) -> Self {
        Self {
            kind,
            calls: Mutex::new(Vec::new()),
            failing: Vec::new(),
            faulting: Vec::new(),
            fail_at_call: None,
        }
    }

    /// fail calls matching `command` or `command:key`
    pub(crate) fn fail(
        mut self,
        call: &str,
    ) -> Self {
        self.failing.push(call.to_string());
        self
    }

    /// return an error for calls matching `call`
    pub(crate) fn fault(
        mut self,
        call: &str,
    ) -> Self {
        self.faulting.push(call.to_string());
        self
    }

    /// fail the n-th call (1-based)
    pub(crate) fn fail_at(
        mut self,
        n: usize,
    ) -> Self {
        self.fail_at_call = Some(n);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl CapabilityChannel for ScriptedChannel {
    fn kind(&self) -> ActionType {
        self.kind
    }

    fn supports(
        &self,
        _command: &str,
    ) -> bool {
        self.kind == ActionType::Remote
    }

    async fn invoke(
        &self,
        command: &str,
        params: &Params,
    ) -> Result<ChannelOutput> {
        let call = describe(command, params);
        let n = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(call.clone());
            calls.len()
        };

        let matches = |rules: &[String]| rules.iter().any(|rule| *rule == call || *rule == command);
        if matches(&self.faulting) {
            return Err(NavflowError::Runtime(format!("{} channel disconnected", self.kind)));
        }
        if matches(&self.failing) || self.fail_at_call == Some(n) {
            return Ok(ChannelOutput::failed(format!("{} rejected", call)));
        }
        Ok(ChannelOutput::success())
    }

    async fn screenshot(&self) -> Result<Option<String>> {
        let n = self.calls.lock().unwrap_or_else(PoisonError::into_inner).len();
        Ok(Some(format!("shot-{}", n)))
    }
}

pub(crate) struct ScriptedVerifier {
    failing: Vec<String>,
    evaluated: Mutex<Vec<String>>,
}

impl ScriptedVerifier {
    pub(crate) fn new() -> Self {
        Self {
            failing: Vec::new(),
            evaluated: Mutex::new(Vec::new()),
        }
    }

    /// fail verifications whose `text` param (or command) equals `what`
    pub(crate) fn fail(
        mut self,
        what: &str,
    ) -> Self {
        self.failing.push(what.to_string());
        self
    }

    pub(crate) fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl VerificationBackend for ScriptedVerifier {
    async fn evaluate(
        &self,
        verification: &Verification,
    ) -> Result<VerificationOutput> {
        let subject = verification.params.get_str("text").unwrap_or_else(|| verification.command.clone());
        self.evaluated.lock().unwrap_or_else(PoisonError::into_inner).push(subject.clone());

        if self.failing.contains(&subject) || self.failing.contains(&verification.command) {
            return Ok(VerificationOutput::failed(format!("{} not found", subject)));
        }
        Ok(VerificationOutput::passed())
    }
}
