// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Software stand-in for the OS protection facility.
//!
//! Output format:
//!
//! ```text
//! magic(4) | flags(4, LE) | description_len(4, LE) | description | body | tag(8)
//! ```
//!
//! `body` is the input XORed with a keystream derived from the scope key,
//! the entropy and the header; `tag` authenticates header, entropy and
//! plaintext. Any bit flip, a missing entropy or a different entropy makes
//! unprotect fail with `ERROR_INVALID_DATA`, as the OS does.
//!
//! This is NOT encryption. It only reproduces the observable contract.

use std::alloc::{Layout, alloc, dealloc};
use std::cell::Cell;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use dpapi_util::{fast_zeroize_vec, is_slice_zeroized};

use crate::blob::DataBlob;
use crate::codes::{
    CRYPTPROTECT_LOCAL_MACHINE, ERROR_INVALID_DATA, ERROR_INVALID_HANDLE,
    ERROR_INVALID_PARAMETER,
};
use crate::traits::NativeApi;

const MAGIC: [u8; 4] = *b"MDPB";

/// Byte written to the slack of [`MockBehaviour::OverAllocate`] buffers.
pub const SLACK_FILL: u8 = 0xAB;
const HEADER_LEN: usize = 12;
const TAG_LEN: usize = 8;

const USER_SCOPE_KEY: u64 = 0x6d6f_636b_5f75_7372;
const MACHINE_SCOPE_KEY: u64 = 0x6d6f_636b_5f6d_6163;
const TAG_DOMAIN: u64 = 0x7461_675f_646f_6d6e;

thread_local! {
    static LAST_ERROR: Cell<i32> = const { Cell::new(0) };
}

fn set_last_error(code: i32) {
    LAST_ERROR.with(|last| last.set(code));
}

/// Callback invoked with the data pointer of every input and entropy blob
/// the mock receives, while the call is in progress.
pub type InputObserver = Box<dyn Fn(*const u8) + Send + Sync>;

/// Configurable behaviour for [`MockNativeApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehaviour {
    /// Normal operation.
    None,
    /// Protect fails with the given last-error code.
    FailProtect(i32),
    /// Unprotect fails with the given last-error code.
    FailUnprotect(i32),
    /// Free reports failure with the given last-error code. The buffer is
    /// still released so tests do not leak.
    FailFree(i32),
    /// Protect and unprotect panic.
    Panic,
    /// Protect and unprotect report success with a null output buffer and a
    /// non-zero length.
    NullOutput,
    /// Protect and unprotect populate the output, then report failure with
    /// `call`; freeing that output fails with `free`.
    FailWithOutput {
        /// Last-error code of the protect/unprotect call.
        call: i32,
        /// Last-error code of the free call.
        free: i32,
    },
    /// Output buffers carry the given number of extra bytes past the
    /// reported length, filled with [`SLACK_FILL`].
    OverAllocate(usize),
    /// The platform probe reports the facility as missing.
    Unsupported,
}

/// Mock of the native facility with allocation bookkeeping.
pub struct MockNativeApi {
    behaviour: MockBehaviour,
    observer: Option<InputObserver>,
    live: Mutex<HashMap<usize, usize>>,
    native_calls: AtomicUsize,
    dirty_frees: AtomicUsize,
    last_flags: AtomicU32,
}

impl MockNativeApi {
    /// Creates a mock with the given behaviour.
    pub fn new(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            observer: None,
            live: Mutex::new(HashMap::new()),
            native_calls: AtomicUsize::new(0),
            dirty_frees: AtomicUsize::new(0),
            last_flags: AtomicU32::new(0),
        }
    }

    /// Registers a callback that sees every input/entropy data pointer.
    pub fn with_input_observer(mut self, observer: InputObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Changes the mock behaviour at runtime.
    pub fn change_behaviour(&mut self, behaviour: MockBehaviour) {
        self.behaviour = behaviour;
    }

    /// Number of protect/unprotect calls received.
    pub fn native_calls(&self) -> usize {
        self.native_calls.load(Ordering::SeqCst)
    }

    /// Number of output buffers that were not all-zero when freed.
    pub fn dirty_frees(&self) -> usize {
        self.dirty_frees.load(Ordering::SeqCst)
    }

    /// Number of output buffers handed out and not freed yet.
    pub fn live_allocations(&self) -> usize {
        self.live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Flag bits of the most recent protect/unprotect call.
    pub fn last_flags(&self) -> u32 {
        self.last_flags.load(Ordering::SeqCst)
    }

    fn begin_call(&self, data_in: &DataBlob, entropy: Option<&DataBlob>, flags: u32) {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        self.last_flags.store(flags, Ordering::SeqCst);

        if let Some(observer) = &self.observer {
            observer(data_in.pb_data);
            if let Some(entropy) = entropy {
                observer(entropy.pb_data);
            }
        }
    }

    fn fail(&self, code: i32) -> bool {
        set_last_error(code);
        false
    }

    /// Applies `FailWithOutput` once the output has been emitted.
    fn finish(&self, emitted: bool) -> bool {
        match self.behaviour {
            MockBehaviour::FailWithOutput { call, .. } if emitted => self.fail(call),
            _ => emitted,
        }
    }

    /// Copies `bytes` into a fresh "native" allocation and points `data_out` at it.
    fn emit(&self, bytes: &[u8], data_out: &mut DataBlob) -> bool {
        let Ok(cb_data) = u32::try_from(bytes.len()) else {
            return self.fail(ERROR_INVALID_PARAMETER);
        };
        let slack = match self.behaviour {
            MockBehaviour::OverAllocate(slack) => slack,
            _ => 0,
        };
        let Some(size) = bytes.len().max(1).checked_add(slack) else {
            return self.fail(ERROR_INVALID_PARAMETER);
        };
        let Ok(layout) = Layout::array::<u8>(size) else {
            return self.fail(ERROR_INVALID_PARAMETER);
        };

        // Safety: `layout` has a non-zero size.
        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            return self.fail(ERROR_INVALID_PARAMETER);
        }

        // Safety: `ptr` is valid for `size >= bytes.len() + slack` bytes.
        unsafe {
            core::ptr::write_bytes(ptr, 0, size);
            core::ptr::write_bytes(ptr.add(size - slack), SLACK_FILL, slack);
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        }

        self.live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(ptr as usize, size);

        data_out.cb_data = cb_data;
        data_out.pb_data = ptr;
        true
    }
}

impl core::fmt::Debug for MockNativeApi {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockNativeApi")
            .field("behaviour", &self.behaviour)
            .field("native_calls", &self.native_calls())
            .field("live_allocations", &self.live_allocations())
            .finish_non_exhaustive()
    }
}

/// Borrows the bytes of a blob, `None` for a null data pointer.
fn read_blob(blob: &DataBlob) -> Option<&[u8]> {
    if blob.is_null() {
        return None;
    }

    // Safety: callers hand in blobs whose pointer is valid for `cb_data` bytes.
    Some(unsafe { core::slice::from_raw_parts(blob.pb_data, blob.len()) })
}

/// An absent entropy blob is equivalent to an empty one.
fn read_entropy(entropy: Option<&DataBlob>) -> Option<&[u8]> {
    match entropy {
        None => Some(&[]),
        Some(blob) => read_blob(blob),
    }
}

fn scope_key(flags: u32) -> u64 {
    if flags & CRYPTPROTECT_LOCAL_MACHINE != 0 {
        MACHINE_SCOPE_KEY
    } else {
        USER_SCOPE_KEY
    }
}

fn keystream_seed(key: u64, entropy: &[u8], header: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u64(key);
    hasher.write_usize(entropy.len());
    hasher.write(entropy);
    hasher.write(header);
    hasher.finish()
}

fn tag(key: u64, entropy: &[u8], header: &[u8], plaintext: &[u8]) -> [u8; TAG_LEN] {
    let mut hasher = DefaultHasher::new();
    hasher.write_u64(key ^ TAG_DOMAIN);
    hasher.write_usize(entropy.len());
    hasher.write(entropy);
    hasher.write(header);
    hasher.write_usize(plaintext.len());
    hasher.write(plaintext);
    hasher.finish().to_le_bytes()
}

/// XORs `bytes` in place with a splitmix64 keystream.
fn apply_keystream(seed: u64, bytes: &mut [u8]) {
    let mut state = seed;
    for chunk in bytes.chunks_mut(8) {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;

        for (byte, k) in chunk.iter_mut().zip(z.to_le_bytes()) {
            *byte ^= k;
        }
    }
}

fn seal(flags: u32, description: Option<&str>, entropy: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let description = description.unwrap_or_default().as_bytes();
    let key = scope_key(flags);

    let mut sealed =
        Vec::with_capacity(HEADER_LEN + description.len() + plaintext.len() + TAG_LEN);
    sealed.extend_from_slice(&MAGIC);
    sealed.extend_from_slice(&flags.to_le_bytes());
    sealed.extend_from_slice(&(description.len() as u32).to_le_bytes());
    sealed.extend_from_slice(description);

    let header_len = sealed.len();
    let seed = keystream_seed(key, entropy, &sealed);
    let tag = tag(key, entropy, &sealed, plaintext);

    sealed.extend_from_slice(plaintext);
    apply_keystream(seed, &mut sealed[header_len..]);
    sealed.extend_from_slice(&tag);

    sealed
}

fn open(entropy: &[u8], sealed: &[u8]) -> Result<Vec<u8>, i32> {
    if sealed.len() < HEADER_LEN + TAG_LEN || sealed[..4] != MAGIC {
        return Err(ERROR_INVALID_DATA);
    }

    let flags = u32::from_le_bytes([sealed[4], sealed[5], sealed[6], sealed[7]]);
    let description_len =
        u32::from_le_bytes([sealed[8], sealed[9], sealed[10], sealed[11]]) as usize;
    let header_len = HEADER_LEN
        .checked_add(description_len)
        .filter(|len| len + TAG_LEN <= sealed.len())
        .ok_or(ERROR_INVALID_DATA)?;

    let key = scope_key(flags);
    let (header, rest) = sealed.split_at(header_len);
    let (body, expected_tag) = rest.split_at(rest.len() - TAG_LEN);

    let mut plaintext = body.to_vec();
    apply_keystream(keystream_seed(key, entropy, header), &mut plaintext);

    if tag(key, entropy, header, &plaintext) != expected_tag {
        fast_zeroize_vec(&mut plaintext);
        return Err(ERROR_INVALID_DATA);
    }

    Ok(plaintext)
}

impl NativeApi for MockNativeApi {
    fn is_supported(&self) -> bool {
        self.behaviour != MockBehaviour::Unsupported
    }

    fn protect(
        &self,
        data_in: &DataBlob,
        description: Option<&str>,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool {
        self.begin_call(data_in, entropy, flags);

        match self.behaviour {
            MockBehaviour::Panic => panic!("mock protect panicked"),
            MockBehaviour::FailProtect(code) => return self.fail(code),
            MockBehaviour::NullOutput => {
                data_out.cb_data = 16;
                return true;
            }
            _ => {}
        }

        let (Some(plaintext), Some(entropy)) = (read_blob(data_in), read_entropy(entropy)) else {
            return self.fail(ERROR_INVALID_PARAMETER);
        };

        let mut sealed = seal(flags, description, entropy, plaintext);
        let emitted = self.emit(&sealed, data_out);
        fast_zeroize_vec(&mut sealed);

        self.finish(emitted)
    }

    fn unprotect(
        &self,
        data_in: &DataBlob,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool {
        self.begin_call(data_in, entropy, flags);

        match self.behaviour {
            MockBehaviour::Panic => panic!("mock unprotect panicked"),
            MockBehaviour::FailUnprotect(code) => return self.fail(code),
            MockBehaviour::NullOutput => {
                data_out.cb_data = 16;
                return true;
            }
            _ => {}
        }

        let (Some(sealed), Some(entropy)) = (read_blob(data_in), read_entropy(entropy)) else {
            return self.fail(ERROR_INVALID_PARAMETER);
        };

        match open(entropy, sealed) {
            Ok(mut plaintext) => {
                let emitted = self.emit(&plaintext, data_out);
                fast_zeroize_vec(&mut plaintext);
                self.finish(emitted)
            }
            Err(code) => self.fail(code),
        }
    }

    fn last_error(&self) -> i32 {
        LAST_ERROR.with(|last| last.get())
    }

    unsafe fn allocation_size(&self, ptr: *mut u8) -> usize {
        self.live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(ptr as usize))
            .copied()
            .unwrap_or(0)
    }

    unsafe fn free(&self, ptr: *mut u8) -> bool {
        let size = self
            .live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&(ptr as usize));

        let Some(size) = size else {
            return self.fail(ERROR_INVALID_HANDLE);
        };

        // Safety: `ptr` was allocated by `emit` with exactly `size` bytes.
        unsafe {
            if !is_slice_zeroized(core::slice::from_raw_parts(ptr, size)) {
                self.dirty_frees.fetch_add(1, Ordering::SeqCst);
            }
            dealloc(ptr, Layout::from_size_align_unchecked(size, 1));
        }

        match self.behaviour {
            MockBehaviour::FailFree(code) | MockBehaviour::FailWithOutput { free: code, .. } => {
                self.fail(code)
            }
            _ => true,
        }
    }
}
