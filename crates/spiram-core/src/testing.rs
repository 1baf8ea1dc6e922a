//! Recording transport for unit tests

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::transport::HostTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Assert,
    Deassert,
    Transfer(Vec<u8>),
    TransferThenReceive(Vec<u8>, usize),
}

/// Records every bus call; can fail the N-th transfer
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub events: Vec<BusEvent>,
    /// Zero-based index of the transfer that fails
    pub fail_transfer_at: Option<usize>,
    pub fail_assert: bool,
    /// Bytes handed back by `transfer_then_receive`
    pub response: Vec<u8>,
    transfers: usize,
    cs_active: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_transfer_at: Some(index),
            ..Self::default()
        }
    }

    pub fn cs_active(&self) -> bool {
        self.cs_active
    }

    /// Bytes sent in each CS frame, in order
    pub fn transactions(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for event in &self.events {
            match event {
                BusEvent::Assert => current = Some(Vec::new()),
                BusEvent::Deassert => {
                    if let Some(tx) = current.take() {
                        out.push(tx);
                    }
                }
                BusEvent::Transfer(bytes) | BusEvent::TransferThenReceive(bytes, _) => {
                    if let Some(tx) = current.as_mut() {
                        tx.extend_from_slice(bytes);
                    }
                }
            }
        }
        out
    }

    fn next_transfer(&mut self) -> Result<()> {
        let index = self.transfers;
        self.transfers += 1;
        if self.fail_transfer_at == Some(index) {
            Err(Error::Transport)
        } else {
            Ok(())
        }
    }
}

impl HostTransport for RecordingTransport {
    fn assert_chip_select(&mut self) -> Result<()> {
        if self.fail_assert {
            return Err(Error::ChipSelect);
        }
        self.cs_active = true;
        self.events.push(BusEvent::Assert);
        Ok(())
    }

    fn deassert_chip_select(&mut self) -> Result<()> {
        self.cs_active = false;
        self.events.push(BusEvent::Deassert);
        Ok(())
    }

    fn transfer(&mut self, out: &[u8]) -> Result<()> {
        self.events.push(BusEvent::Transfer(out.to_vec()));
        self.next_transfer()
    }

    fn transfer_then_receive(&mut self, out: &[u8], buf: &mut [u8]) -> Result<()> {
        self.events
            .push(BusEvent::TransferThenReceive(out.to_vec(), buf.len()));
        self.next_transfer()?;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.response.get(i).copied().unwrap_or(0);
        }
        Ok(())
    }
}
