//! Per-generation framing rules.
//!
//! Each hardware family gets its own variant; the framer dispatches on it
//! once per byte. Rules inspect the freshly shifted command buffer and
//! update the parity counter, stored command, and filter flag. A rule may
//! also surface a ROM-driven volume request, which the caller applies only
//! when the game enables ROM volume control.

use alt_common::HardwareGen;
use tracing::debug;

use crate::state::FramerState;

/// Framing rule set, one variant per hardware family.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GenerationRules {
    /// WPCDCS, WPCSECURITY, WPC95, WPC95DCS: 16-bit pairs with
    /// 0x55-prefixed four-byte meta sequences.
    WpcDcs,
    /// WPCALPHA_2, WPCDMD, WPCFLIPTRON: 8-bit commands, 0x7A escapes to
    /// 16-bit, 0x79 volume sequences.
    WpcAlpha2,
    /// WPCALPHA_1 and the S11 family: every byte arrives doubled or
    /// tripled; duplicates are collapsed.
    S11,
    /// DEDMD16/32/64 and DE: 8-bit commands with 0x00/0xFF idle framing.
    DataEast,
    /// Whitestar (WS, WS_1, WS_2): 0xFC..0xFF start bytes, 0xFE-prefixed
    /// volume and drop ranges.
    Whitestar,
    /// Gottlieb System 80A: 8-bit commands, 0x00 is a clock pulse.
    Gts80a,
    /// Unrecognized generation: every byte passes through as 8-bit.
    PassThrough,
}

impl GenerationRules {
    pub fn for_gen(gen: HardwareGen) -> Self {
        match gen {
            HardwareGen::WpcDcs
            | HardwareGen::WpcSecurity
            | HardwareGen::Wpc95
            | HardwareGen::Wpc95Dcs => GenerationRules::WpcDcs,
            HardwareGen::WpcAlpha2 | HardwareGen::WpcDmd | HardwareGen::WpcFliptron => {
                GenerationRules::WpcAlpha2
            }
            HardwareGen::WpcAlpha1
            | HardwareGen::S11
            | HardwareGen::S11X
            | HardwareGen::S11B2
            | HardwareGen::S11C => GenerationRules::S11,
            HardwareGen::DeDmd16
            | HardwareGen::DeDmd32
            | HardwareGen::DeDmd64
            | HardwareGen::De => GenerationRules::DataEast,
            HardwareGen::Ws | HardwareGen::Ws1 | HardwareGen::Ws2 => GenerationRules::Whitestar,
            HardwareGen::Gts80a => GenerationRules::Gts80a,
            HardwareGen::None => GenerationRules::PassThrough,
        }
    }

    /// Apply this rule set to the freshly shifted buffer.
    ///
    /// Returns a global-volume request when the byte completed a ROM
    /// volume sequence (the byte is consumed either way).
    pub(crate) fn preprocess(self, st: &mut FramerState, cmd: u8) -> Option<f32> {
        match self {
            GenerationRules::WpcDcs => preprocess_wpc_dcs(st),
            GenerationRules::WpcAlpha2 => preprocess_wpc_alpha2(st, cmd),
            GenerationRules::S11 => {
                if cmd as u16 != st.b(1) {
                    st.stored = 0;
                    st.counter = 0;
                } else {
                    // doubled byte: swallow the repeat
                    st.counter = 1;
                }
                None
            }
            GenerationRules::DataEast => {
                st.filter = false;
                if cmd != 0xFF && cmd != 0x00 {
                    st.stored = 0;
                    st.counter = 0;
                } else {
                    // idle framing byte
                    st.counter = 1;
                }
                if st.b(1) == 0x00 && cmd == 0x00 {
                    // a full 0x0000 pair is dropped, not emitted
                    st.stored = 0;
                    st.counter = 0;
                    st.filter = true;
                }
                None
            }
            GenerationRules::Whitestar => preprocess_whitestar(st, cmd),
            GenerationRules::Gts80a => {
                st.stored = 0;
                st.counter = 0;
                // 0x00 arrives constantly as a clock signal; filter it out
                st.filter = cmd == 0x00;
                None
            }
            GenerationRules::PassThrough => {
                st.stored = 0;
                st.counter = 0;
                st.filter = false;
                None
            }
        }
    }
}

/// Byte values that can follow 0x55 in a DCS meta sequence.
fn dcs_meta_class(byte: u16) -> bool {
    (0xAA..=0xB0).contains(&byte) || (0xBA..=0xC3).contains(&byte)
}

fn preprocess_wpc_dcs(st: &mut FramerState) -> Option<f32> {
    let (b0, b1, b2, b3) = (st.b(0), st.b(1), st.b(2), st.b(3));
    // Checksum convention: the byte after the meta opcode is followed by
    // its complement.
    let parity_ok = b1 == (b0 ^ 0xFF);

    if b3 == 0x55 && (0xAB..=0xB0).contains(&b2) && parity_ok {
        // per-DCS-channel mixing level; no counterpart at this layer
        debug!(channel = b2, level = b1, "DCS per-channel level, filtered");
        consume_meta(st);
        None
    } else if b3 == 0x55 && (b2 == 0xC2 || b2 == 0xC3) {
        // DCS software major/minor version bytes
        consume_meta(st);
        None
    } else if b3 == 0x55 && (0xBA..=0xC1).contains(&b2) && parity_ok {
        // undocumented meta command
        consume_meta(st);
        None
    } else if b3 == 0x55 && b2 == 0xAA {
        let volume = if parity_ok {
            Some(if b1 == 0 {
                0.0
            } else {
                (0.981_201_f32.powf((255 - b1) as f32) * 4.0).min(1.0)
            })
        } else {
            debug!(
                buffer = %format_args!("{b3:02X} {b2:02X} {b1:02X} {b0:02X}"),
                "DCS volume sequence failed parity, filtered"
            );
            None
        };
        consume_meta(st);
        volume
    } else if (b1 == 0x55 && dcs_meta_class(b0)) || (b2 == 0x55 && dcs_meta_class(b1)) {
        // A meta sequence may be in flight; hold emission until all four
        // bytes have arrived and the branches above can decide.
        st.counter = 1;
        st.filter = false;
        None
    } else {
        st.filter = false;
        None
    }
}

/// Shared tail of every consumed DCS meta sequence.
fn consume_meta(st: &mut FramerState) {
    st.wipe_buffer();
    st.counter = 0;
    st.filter = true;
}

fn preprocess_wpc_alpha2(st: &mut FramerState, cmd: u8) -> Option<f32> {
    st.filter = false;
    if st.b(2) == 0x79 && st.b(1) == (st.b(0) ^ 0xFF) {
        // volume op: first byte = volume, second = complement
        let volume = (st.b(1) as f32 / 127.0).min(1.0);
        st.wipe_buffer();
        st.counter = 0;
        st.filter = true;
        Some(volume)
    } else if st.b(1) == 0x7A {
        // second half of a 16-bit command
        st.stored = st.b(1);
        st.counter = 0;
        None
    } else if cmd != 0x7A {
        // plain 8-bit command
        st.stored = 0;
        st.counter = 0;
        None
    } else {
        // 0x7A starts a 16-bit sequence
        st.counter = 1;
        None
    }
}

fn preprocess_whitestar(st: &mut FramerState, cmd: u8) -> Option<f32> {
    st.filter = false;
    let mut volume = None;

    if st.b(1) == 0xFE {
        if (0x10..=0x2F).contains(&cmd) {
            volume = Some((0x2F - cmd) as f32 / 31.0);
            st.wipe_buffer();
            st.counter = 0;
            st.filter = true;
        } else if (0x01..=0x0F).contains(&cmd) {
            // FE 01 .. FE 0F carry nothing for us
            st.stored = 0;
            st.counter = 0;
            st.filter = true;
        }
    }

    // A command start byte is always FF, FE, FD, or FC, and never the
    // second byte of a pair.
    if cmd & 0xFC == 0xFC {
        st.counter = 1;
    }

    volume
}
