// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::hint::black_box;

// Every offset, count and size in the input is attacker-controlled;
// parsing must reject out-of-bounds structures with an error rather
// than panic or read past the buffer.
fuzz_target!(|data: &[u8]| {
    if let Ok(image) = elfmeta::parse(data) {
        let _ = black_box(image);
    }
});
