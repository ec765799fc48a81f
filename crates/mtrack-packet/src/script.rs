//! A scripted peripheral for exercising the codec without hardware.
//!
//! Each `select(true)` consumes the next [`Step`], which decides how the
//! fake device behaves for that one transaction. Requests are recorded so
//! tests can assert on what was sent.

use std::collections::VecDeque;

use mtrack_link::{check_lengths, Link, LinkError};

use crate::codec::RESPONSE_HEADER_SIZE;

/// Behaviour of the scripted device for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Answer with a result code and payload.
    Reply { result: u8, payload: Vec<u8> },
    /// Never assert ready.
    Silent,
    /// Fail every exchange with a bus error.
    Fault,
    /// Assert ready before select, as if a response were still pending.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Command,
    Header,
    Payload,
    Done,
}

/// Scripted [`Link`] implementation.
#[derive(Debug)]
pub struct ScriptedLink {
    steps: VecDeque<Step>,
    when_empty: Step,
    current: Option<Step>,
    phase: Phase,
    selected: bool,
    requests: Vec<Vec<u8>>,
    selects: Vec<bool>,
    resets: usize,
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLink {
    /// An empty script. Once exhausted the device goes silent.
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            when_empty: Step::Silent,
            current: None,
            phase: Phase::Idle,
            selected: false,
            requests: Vec::new(),
            selects: Vec::new(),
            resets: 0,
        }
    }

    pub fn push(mut self, step: Step) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Queue a reply with an explicit result code.
    pub fn reply(self, result: u8, payload: impl Into<Vec<u8>>) -> Self {
        self.push(Step::Reply {
            result,
            payload: payload.into(),
        })
    }

    /// Queue a successful reply.
    pub fn ok(self, payload: impl Into<Vec<u8>>) -> Self {
        self.reply(0, payload)
    }

    pub fn silent(self) -> Self {
        self.push(Step::Silent)
    }

    pub fn fault(self) -> Self {
        self.push(Step::Fault)
    }

    pub fn busy(self) -> Self {
        self.push(Step::Busy)
    }

    /// Step replayed forever once the queue runs dry.
    pub fn when_empty(mut self, step: Step) -> Self {
        self.when_empty = step;
        self
    }

    /// Every request received, opcode first.
    pub fn requests(&self) -> &[Vec<u8>] {
        &self.requests
    }

    /// Opcodes of every request received.
    pub fn opcodes(&self) -> Vec<u8> {
        self.requests.iter().filter_map(|req| req.first().copied()).collect()
    }

    /// Select line history, `true` = selected.
    pub fn selects(&self) -> &[bool] {
        &self.selects
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Steps not consumed yet.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    fn next_step(&mut self) -> Step {
        self.steps
            .pop_front()
            .unwrap_or_else(|| self.when_empty.clone())
    }
}

impl Link for ScriptedLink {
    fn select(&mut self, active: bool) -> mtrack_link::Result<()> {
        self.selects.push(active);
        self.selected = active;
        if active {
            self.current = Some(self.next_step());
            self.phase = Phase::Command;
        } else {
            self.current = None;
            self.phase = Phase::Idle;
        }
        Ok(())
    }

    fn is_ready(&mut self) -> mtrack_link::Result<bool> {
        if !self.selected {
            if self.steps.front() == Some(&Step::Busy) {
                self.steps.pop_front();
                return Ok(true);
            }
            return Ok(false);
        }
        Ok(!matches!(self.current, Some(Step::Silent)) && self.phase != Phase::Done)
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> mtrack_link::Result<()> {
        check_lengths(tx, rx)?;
        let Some(step) = &self.current else {
            return Err(LinkError::Io(std::io::Error::other("exchange while deselected")));
        };

        let (result, payload) = match step {
            Step::Fault => return Err(LinkError::Io(std::io::Error::other("scripted bus fault"))),
            Step::Reply { result, payload } => (*result, payload),
            Step::Silent | Step::Busy => {
                rx.fill(0);
                return Ok(());
            }
        };

        match self.phase {
            Phase::Command => {
                self.requests.push(tx.to_vec());
                rx.fill(0);
                self.phase = Phase::Header;
            }
            Phase::Header => {
                let mut header = [0u8; RESPONSE_HEADER_SIZE];
                header[..2].copy_from_slice(&(payload.len() as u16).to_le_bytes());
                header[2] = result;
                let n = rx.len().min(RESPONSE_HEADER_SIZE);
                rx[..n].copy_from_slice(&header[..n]);
                self.phase = Phase::Payload;
            }
            Phase::Payload => {
                let n = rx.len().min(payload.len());
                rx[..n].copy_from_slice(&payload[..n]);
                rx[n..].fill(0);
                self.phase = Phase::Done;
            }
            Phase::Idle | Phase::Done => rx.fill(0),
        }
        Ok(())
    }

    fn reset_pulse(&mut self) -> mtrack_link::Result<()> {
        self.resets += 1;
        Ok(())
    }
}
