// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub mod gateway;
pub mod plan;
pub mod prompts;
pub mod provider;

pub use gateway::{GatewayError, ReasoningGateway, RetryPolicy};
pub use plan::AgentPlan;
pub use provider::{AiProvider, GeminiAdapter, ProviderError};
