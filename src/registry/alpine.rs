//! Alpine matrix: musl x-tools toolchains, one compiler per host except amd64.

use super::{ArchTables, TableSource};
use crate::arch::Arch::{self, *};

const ALL: &[Arch] = &[I386, Amd64, ArmV6, ArmV7, Arm64V8, Ppc64le];

const SOURCE: TableSource = TableSource {
    host_archs: ALL,
    compiler_archs: ALL,
    compilers_by_host: &[
        (I386, &[I386]),
        (Amd64, &[Amd64, I386, ArmV6, ArmV7, Arm64V8, Ppc64le]),
        (ArmV6, &[ArmV6]),
        (ArmV7, &[ArmV7]),
        (Arm64V8, &[Arm64V8]),
        (Ppc64le, &[Ppc64le]),
    ],
    ports: &[
        (I386, 3803),
        (Amd64, 3804),
        (ArmV6, 3806),
        (ArmV7, 3807),
        (Arm64V8, 3808),
        (Ppc64le, 3810),
    ],
    toolchains: &[
        (I386, "i686-alpine-linux-musl"),
        (Amd64, "x86_64-alpine-linux-musl"),
        (ArmV6, "armv6-alpine-linux-musleabihf"),
        (ArmV7, "armv7-alpine-linux-musleabihf"),
        (Arm64V8, "aarch64-alpine-linux-musl"),
        (Ppc64le, "powerpc64le-alpine-linux-musl"),
    ],
    packages: &[
        (I386, ""),
        (Amd64, ""),
        (ArmV6, ""),
        (ArmV7, ""),
        (Arm64V8, ""),
        (Ppc64le, ""),
    ],
    flags: &[
        (I386, "START_DISTCC_I686_ALPINE_LINUX_MUSL"),
        (Amd64, "START_DISTCC_X86_64_ALPINE_LINUX_MUSL"),
        (ArmV6, "START_DISTCC_ARMV6_ALPINE_LINUX_MUSLEABIHF"),
        (ArmV7, "START_DISTCC_ARMV7_ALPINE_LINUX_MUSLEABIHF"),
        (Arm64V8, "START_DISTCC_AARCH64_ALPINE_LINUX_MUSL"),
        (Ppc64le, "START_DISTCC_PPC64LE_ALPINE_LINUX_MUSL"),
    ],
};

pub(super) fn tables() -> ArchTables {
    SOURCE.to_tables()
}
