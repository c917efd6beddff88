// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes for the ATS control plane (§3 Data Model).

crate::define_id! {
    /// Identifies a session from submission to result-write (§3 Session).
    pub struct SessionId;
}

crate::define_id! {
    /// Identifies a client connected to the control/session services (§4.1).
    pub struct ClientId;
}

crate::define_id! {
    /// Monotonically increasing per-session command id (§4.4).
    ///
    /// Minted from a `SequentialIdGen`; formatted as a plain base-10 string
    /// so it compares and serializes the same way the Java `long` it
    /// replaces would.
    pub struct CommandId;
}

crate::define_id! {
    /// Identifies a Job (§3 Job & Test).
    pub struct JobLocatorId;
}

crate::define_id! {
    /// Identifies a Test within a Job (§3 Job & Test).
    pub struct TestLocatorId;
}

crate::define_id! {
    /// Identifies a device as returned by the Device Querier (§4.5).
    pub struct DeviceId;
}
