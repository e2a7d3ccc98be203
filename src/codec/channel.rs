//! The byte source the decoder pulls from.
//!
//! A [`Channel`] may hand back fewer bytes than asked for; `Ok(0)` means the
//! peer closed the stream. Reads are never retried past the bytes still owed to
//! the packet being decoded, so a channel can be shared by consecutive decode
//! calls as long as only one runs at a time.

use super::error::DecodeError;
use std::io::{self, Read};

pub trait Channel {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read + ?Sized> Channel for R {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

/// One receive call, retried only on `Interrupted`.
pub(crate) fn receive_some<C: Channel + ?Sized>(
    channel: &mut C,
    buf: &mut [u8],
) -> Result<usize, DecodeError> {
    loop {
        match channel.receive(buf) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
}

pub(crate) fn receive_byte<C: Channel + ?Sized>(channel: &mut C) -> Result<u8, DecodeError> {
    let mut byte = [0u8; 1];
    fill_at_least(channel, &mut byte, 0, 1)?;
    Ok(byte[0])
}

/// Receives into `buf[filled..]` until at least `needed` bytes are present.
/// Returns the new fill level, which can be anywhere up to `buf.len()`.
pub(crate) fn fill_at_least<C: Channel + ?Sized>(
    channel: &mut C,
    buf: &mut [u8],
    mut filled: usize,
    needed: usize,
) -> Result<usize, DecodeError> {
    while filled < needed {
        let received = receive_some(channel, &mut buf[filled..])?;
        if received == 0 {
            return Err(DecodeError::TruncatedRead {
                expected: needed,
                received: filled,
            });
        }
        filled += received;
    }

    Ok(filled)
}

pub(crate) fn receive_exact<C: Channel + ?Sized>(
    channel: &mut C,
    buf: &mut [u8],
) -> Result<(), DecodeError> {
    let needed = buf.len();
    fill_at_least(channel, buf, 0, needed)?;
    Ok(())
}

/// Receives and drops `len` bytes through a small stack buffer.
pub(crate) fn discard<C: Channel + ?Sized>(
    channel: &mut C,
    len: usize,
) -> Result<(), DecodeError> {
    let mut scratch = [0u8; 64];
    let mut dropped = 0;
    while dropped < len {
        let want = (len - dropped).min(scratch.len());
        let received = receive_some(channel, &mut scratch[..want])?;
        if received == 0 {
            return Err(DecodeError::TruncatedRead {
                expected: len,
                received: dropped,
            });
        }
        dropped += received;
    }

    Ok(())
}
