//! Record file I/O
//!
//! Positioned reads and writes of headers, record slots and single fields,
//! shared by the sequence store and the shard store. Callers hold the key's
//! lock for the whole lifetime of a `RecordFile`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::SyncPolicy;
use crate::error::{Result, StoreError};
use crate::layout::{self, FixedRecord, Header, Status, HEADER_LEN};

/// Borrowed view of one open data file
pub(crate) struct RecordFile<'a> {
    file: &'a mut File,
    path: &'a Path,
    sync_policy: SyncPolicy,
}

impl<'a> RecordFile<'a> {
    pub(crate) fn new(file: &'a mut File, path: &'a Path, sync_policy: SyncPolicy) -> Self {
        Self {
            file,
            path,
            sync_policy,
        }
    }

    /// Current file length in bytes
    pub(crate) fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    // =========================================================================
    // Header
    // =========================================================================

    /// Read and validate the header of an existing file
    ///
    /// A file too short for its header, or for the records its header claims,
    /// is `Corrupt`.
    pub(crate) fn header<R: FixedRecord>(&mut self) -> Result<Header> {
        let len = self.len()?;
        if len < HEADER_LEN as u64 {
            return Err(StoreError::corrupt(
                self.path,
                format!("file is {} bytes, header needs {}", len, HEADER_LEN),
            ));
        }
        let header = self.read_header()?;
        self.check_fits::<R>(&header, len)?;
        Ok(header)
    }

    /// Like `header`, but a file shorter than the header reads as empty
    ///
    /// Used by append, where a freshly created (or torn, never-counted) file
    /// simply starts over at record 1.
    pub(crate) fn header_or_empty<R: FixedRecord>(&mut self) -> Result<Header> {
        let len = self.len()?;
        if len < HEADER_LEN as u64 {
            return Ok(Header::default());
        }
        let header = self.read_header()?;
        self.check_fits::<R>(&header, len)?;
        Ok(header)
    }

    pub(crate) fn write_header(&mut self, header: &Header) -> Result<()> {
        self.write_at(0, &header.encode())
    }

    fn read_header(&mut self) -> Result<Header> {
        let mut buf = [0u8; HEADER_LEN];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut buf)?;
        Header::decode(&buf)
            .ok_or_else(|| StoreError::corrupt(self.path, "short header read"))
    }

    fn check_fits<R: FixedRecord>(&self, header: &Header, len: u64) -> Result<()> {
        match layout::required_len::<R>(header.total_records) {
            Some(required) if required <= len => Ok(()),
            Some(required) => Err(StoreError::corrupt(
                self.path,
                format!(
                    "header counts {} records ({} bytes) but file is {} bytes",
                    header.total_records, required, len
                ),
            )),
            None => Err(StoreError::corrupt(
                self.path,
                format!("record count {} overflows", header.total_records),
            )),
        }
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Read record `index` (1-based); the caller has bound-checked it
    pub(crate) fn read_record<R: FixedRecord>(&mut self, index: u64) -> Result<R> {
        let offset = self.record_offset::<R>(index)?;
        let mut buf = vec![0u8; R::LEN];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => StoreError::corrupt(
                self.path,
                format!("record {} truncated", index),
            ),
            _ => StoreError::Io(e),
        })?;
        R::decode(&buf).ok_or_else(|| {
            StoreError::corrupt(self.path, format!("record {} truncated", index))
        })
    }

    /// Read every record counted by `header`, in slot order
    pub(crate) fn read_records<R: FixedRecord>(&mut self, header: &Header) -> Result<Vec<R>> {
        let total = header.total_records;
        let body_len = layout::required_len::<R>(total)
            .map(|len| len - HEADER_LEN as u64)
            .ok_or_else(|| StoreError::corrupt(self.path, "record count overflows"))?;

        let mut body = vec![0u8; body_len as usize];
        self.file.seek(SeekFrom::Start(HEADER_LEN as u64))?;
        self.file.read_exact(&mut body)?;

        body.chunks_exact(R::LEN)
            .enumerate()
            .map(|(slot, chunk)| {
                R::decode(chunk).ok_or_else(|| {
                    StoreError::corrupt(self.path, format!("record {} truncated", slot + 1))
                })
            })
            .collect()
    }

    /// Write a whole record into slot `index`
    pub(crate) fn write_record<R: FixedRecord>(&mut self, index: u64, record: &R) -> Result<()> {
        let offset = self.record_offset::<R>(index)?;
        self.write_at(offset, &record.encode())
    }

    /// Overwrite the status byte of record `index`
    pub(crate) fn write_status<R: FixedRecord>(&mut self, index: u64, status: Status) -> Result<()> {
        let offset = layout::status_offset::<R>(index)
            .ok_or_else(|| self.overflow(index))?;
        self.write_at(offset, &[status.as_byte()])
    }

    /// Overwrite a big-endian u32 field `field_offset` bytes into record `index`
    pub(crate) fn write_u32_field<R: FixedRecord>(
        &mut self,
        index: u64,
        field_offset: usize,
        value: u32,
    ) -> Result<()> {
        let offset = self
            .record_offset::<R>(index)?
            .checked_add(field_offset as u64)
            .ok_or_else(|| self.overflow(index))?;
        self.write_at(offset, &value.to_be_bytes())
    }

    // =========================================================================
    // Durability
    // =========================================================================

    /// Flush written bytes per the configured policy
    pub(crate) fn sync(&mut self) -> Result<()> {
        match self.sync_policy {
            SyncPolicy::EveryWrite => self.file.sync_data()?,
            SyncPolicy::OsBuffered => self.file.flush()?,
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    fn record_offset<R: FixedRecord>(&self, index: u64) -> Result<u64> {
        layout::record_offset::<R>(index).ok_or_else(|| self.overflow(index))
    }

    fn overflow(&self, index: u64) -> StoreError {
        StoreError::corrupt(
            self.path,
            format!("record index {} has no valid file offset", index),
        )
    }
}
