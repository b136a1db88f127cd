// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use super::{deliver, Delivery, Inbox, MessageTarget, PostOptions};
use crate::error::TransportResult;
use crate::{ExecutionContext, StructuredClone};
use std::sync::Arc;

pub(crate) struct WindowRef<M: StructuredClone> {
    pub(crate) context: ExecutionContext,
    pub(crate) inbox: Inbox<M>,
}

impl<M: StructuredClone> Clone for WindowRef<M> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            inbox: self.inbox.clone(),
        }
    }
}

/// Reference held by one window to another.
pub struct WindowProxy<M: StructuredClone> {
    sender: WindowRef<M>,
    target: WindowRef<M>,
}

impl<M: StructuredClone> Clone for WindowProxy<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            target: self.target.clone(),
        }
    }
}

impl<M: StructuredClone> WindowProxy<M> {
    pub(crate) fn new(sender: WindowRef<M>, target: WindowRef<M>) -> Self {
        Self { sender, target }
    }

    /// Context the proxy points at.
    pub fn target(&self) -> &ExecutionContext {
        &self.target.context
    }

    fn reversed(&self) -> Self {
        Self {
            sender: self.target.clone(),
            target: self.sender.clone(),
        }
    }
}

impl<M: StructuredClone> MessageTarget<M> for WindowProxy<M> {
    fn post_message(&self, message: &M, options: PostOptions<M>) -> TransportResult<()> {
        if let Some(target_origin) = &options.target_origin {
            if !target_origin.matches(self.target.context.origin()) {
                tracing::warn!(
                    target_window = self.target.context.label(),
                    %target_origin,
                    actual = %self.target.context.origin(),
                    "target origin mismatch, message dropped"
                );
                return Ok(());
            }
        }

        let source: Arc<dyn MessageTarget<M>> = Arc::new(self.reversed());
        let delivery = Delivery::new(
            message,
            self.sender.context.origin().to_string(),
            Some(source),
            options.transfer,
        )?;
        deliver(&self.target.inbox, self.target.context.label(), delivery);
        Ok(())
    }

    fn label(&self) -> String {
        format!("window:{}", self.target.context.label())
    }
}
