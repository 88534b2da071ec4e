//! End-user account linking via the identity provider's device-authorization
//! flow.
//!
//! The flow never sees a password: the user approves a short code in their
//! browser while we poll the token endpoint, then the granted token is
//! traded through an exchange code into the game-session client registration
//! and minted into a durable device credential. A manual authorization-code
//! path covers registrations that refuse the device grant.

pub mod flow;
pub mod provider;

pub use {
    flow::{AuthFlow, DeviceFlowPrompt, InitiateOutcome, PollOutcome},
    provider::{DeviceAuthorization, IdentityProvider, ProviderError, TokenGrant},
};
