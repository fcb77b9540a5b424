//! Debian-like matrix: cross compilers come from the distribution's own
//! `gcc-<triple>` packages.

use super::{ArchTables, TableSource};
use crate::arch::Arch::{self, *};

const ALL: &[Arch] = &[Amd64, I386, ArmV5, ArmV7, Arm64V8, Ppc64le, S390x, Mips64le];

const SOURCE: TableSource = TableSource {
    host_archs: ALL,
    compiler_archs: ALL,
    compilers_by_host: &[
        (Amd64, ALL),
        (I386, ALL),
        (ArmV5, &[ArmV5]),
        (ArmV7, &[ArmV7]),
        (Arm64V8, &[Amd64, I386, ArmV5, ArmV7, Arm64V8]),
        (Ppc64le, &[Amd64, I386, Arm64V8, Ppc64le]),
        (S390x, &[S390x]),
        (Mips64le, &[Mips64le]),
    ],
    ports: &[
        (I386, 3603),
        (Amd64, 3604),
        (ArmV5, 3605),
        (ArmV7, 3607),
        (Arm64V8, 3608),
        (S390x, 3609),
        (Ppc64le, 3610),
        (Mips64le, 3611),
    ],
    toolchains: &[
        (Amd64, "x86_64-linux-gnu"),
        (I386, "i686-linux-gnu"),
        (ArmV5, "arm-linux-gnueabi"),
        (ArmV7, "arm-linux-gnueabihf"),
        (Arm64V8, "aarch64-linux-gnu"),
        (Ppc64le, "powerpc64le-linux-gnu"),
        (S390x, "s390x-linux-gnu"),
        (Mips64le, "mipsel-linux-gnu"),
    ],
    packages: &[
        (Amd64, "gcc-x86-64-linux-gnu g++-x86-64-linux-gnu binutils-x86-64-linux-gnu"),
        (I386, "gcc-i686-linux-gnu g++-i686-linux-gnu binutils-i686-linux-gnu"),
        (ArmV5, "gcc-arm-linux-gnueabi g++-arm-linux-gnueabi binutils-arm-linux-gnueabi"),
        (ArmV7, "gcc-arm-linux-gnueabihf g++-arm-linux-gnueabihf binutils-arm-linux-gnueabihf"),
        (Arm64V8, "gcc-aarch64-linux-gnu g++-aarch64-linux-gnu binutils-aarch64-linux-gnu"),
        (
            Ppc64le,
            "gcc-powerpc64le-linux-gnu g++-powerpc64le-linux-gnu binutils-powerpc64le-linux-gnu",
        ),
        (S390x, "gcc-s390x-linux-gnu g++-s390x-linux-gnu binutils-s390x-linux-gnu"),
        (Mips64le, "gcc-mipsel-linux-gnu g++-mipsel-linux-gnu binutils-mipsel-linux-gnu"),
    ],
    flags: &[
        (Amd64, "START_DISTCC_X86_64_LINUX_GNU"),
        (I386, "START_DISTCC_I686_LINUX_GNU"),
        (ArmV5, "START_DISTCC_ARM_LINUX_GNUEABI"),
        (ArmV7, "START_DISTCC_ARM_LINUX_GNUEABIHF"),
        (Arm64V8, "START_DISTCC_AARCH64_LINUX_GNU"),
        (Ppc64le, "START_DISTCC_PPC64LE_LINUX_GNU"),
        (S390x, "START_DISTCC_S390X_LINUX_GNU"),
        (Mips64le, "START_DISTCC_MIPS64LE_LINUX_GNU"),
    ],
};

pub(super) fn tables() -> ArchTables {
    SOURCE.to_tables()
}
