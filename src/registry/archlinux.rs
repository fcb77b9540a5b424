//! Arch Linux matrix: non-native compilers are prebuilt x-tools toolchains,
//! so no per-compiler distribution packages are needed.

use super::{ArchTables, TableSource};
use crate::arch::Arch::{self, *};

const ALL: &[Arch] = &[Amd64, ArmV5, ArmV6, ArmV7, Arm64V8];

const SOURCE: TableSource = TableSource {
    host_archs: ALL,
    compiler_archs: ALL,
    compilers_by_host: &[
        (Amd64, ALL),
        (ArmV5, &[ArmV5]),
        (ArmV6, &[ArmV6]),
        (ArmV7, &[ArmV7]),
        (Arm64V8, &[Arm64V8]),
    ],
    ports: &[
        (Amd64, 3704),
        (ArmV5, 3705),
        (ArmV6, 3706),
        (ArmV7, 3707),
        (Arm64V8, 3708),
    ],
    toolchains: &[
        (Amd64, "x86_64-build_pc-linux-gnu"),
        (ArmV5, "armv5tel-unknown-linux-gnueabi"),
        (ArmV6, "armv6l-unknown-linux-gnueabihf"),
        (ArmV7, "armv7l-unknown-linux-gnueabihf"),
        (Arm64V8, "aarch64-unknown-linux-gnu"),
    ],
    packages: &[(Amd64, ""), (ArmV5, ""), (ArmV6, ""), (ArmV7, ""), (Arm64V8, "")],
    flags: &[
        (Amd64, "START_DISTCC_X86_64_PC_LINUX_GNU"),
        (ArmV5, "START_DISTCC_ARMV5TEL_UNKNOWN_LINUX_GNUEABI"),
        (ArmV6, "START_DISTCC_ARMV6L_UNKNOWN_LINUX_GNUEABIHF"),
        (ArmV7, "START_DISTCC_ARMV7L_UNKNOWN_LINUX_GNUEABIHF"),
        (Arm64V8, "START_DISTCC_AARCH64_UNKNOWN_LINUX_GNU"),
    ],
};

pub(super) fn tables() -> ArchTables {
    SOURCE.to_tables()
}
