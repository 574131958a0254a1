//! Little-endian payload writer and reader.

use heapless::Vec;

use crate::frame::{FrameError, MAX_PAYLOAD_SIZE};

pub(crate) struct PayloadWriter {
    buf: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl PayloadWriter {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.buf
            .extend_from_slice(bytes)
            .map_err(|_| FrameError::PayloadTooLarge)
    }

    pub(crate) fn put_u8(&mut self, value: u8) -> Result<(), FrameError> {
        self.put_bytes(&[value])
    }

    pub(crate) fn put_u16(&mut self, value: u16) -> Result<(), FrameError> {
        self.put_bytes(&value.to_le_bytes())
    }

    pub(crate) fn put_i16(&mut self, value: i16) -> Result<(), FrameError> {
        self.put_bytes(&value.to_le_bytes())
    }

    pub(crate) fn put_i32(&mut self, value: i32) -> Result<(), FrameError> {
        self.put_bytes(&value.to_le_bytes())
    }

    pub(crate) fn put_f32(&mut self, value: f32) -> Result<(), FrameError> {
        self.put_bytes(&value.to_le_bytes())
    }

    pub(crate) fn finish(self) -> Vec<u8, MAX_PAYLOAD_SIZE> {
        self.buf
    }
}

pub(crate) struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn take<const N: usize>(&mut self) -> Result<[u8; N], FrameError> {
        let end = self.pos + N;
        let slice = self.data.get(self.pos..end).ok_or(FrameError::InvalidFrame)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, FrameError> {
        Ok(self.take::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, FrameError> {
        self.take().map(u16::from_le_bytes)
    }

    pub(crate) fn i16(&mut self) -> Result<i16, FrameError> {
        self.take().map(i16::from_le_bytes)
    }

    pub(crate) fn i32(&mut self) -> Result<i32, FrameError> {
        self.take().map(i32::from_le_bytes)
    }

    pub(crate) fn f32(&mut self) -> Result<f32, FrameError> {
        self.take().map(f32::from_le_bytes)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
