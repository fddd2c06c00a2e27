//! Post-emission hooks.
//!
//! Some logical commands carry meaning beyond the sample catalog: a few
//! per-generation values are global "stop all music" requests. These run
//! after normal command processing, whether or not dispatch succeeded.

use alt_common::HardwareGen;

/// Whether the given logical command is a global music stop for this
/// hardware generation.
pub fn stops_music(gen: HardwareGen, cmd: u16) -> bool {
    match gen {
        HardwareGen::WpcDcs
        | HardwareGen::WpcSecurity
        | HardwareGen::Wpc95
        | HardwareGen::Wpc95Dcs => cmd == 0x03E3,

        // 0x0019 has been observed on some DEDMD32 titles but is not
        // confirmed as a stop; only the known pair is handled.
        HardwareGen::DeDmd32 => cmd == 0x0018 || cmd == 0x0023,

        // Both stop encodings appear in the wild: 0xFn00 and 0xF0nn.
        HardwareGen::Ws | HardwareGen::Ws1 | HardwareGen::Ws2 => {
            cmd == 0x0000 || (cmd & 0xF0FF) == 0xF000 || (cmd & 0xFF00) == 0xF000
        }

        _ => false,
    }
}
