// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use super::{deliver, Delivery, EventReceiver, Inbox, Mailbox, MessageTarget, PostOptions};
use crate::error::TransportResult;
use crate::{ExecutionContext, StructuredClone};

/// Parent-side object of a dedicated worker.
///
/// Posting sends into the worker's global scope; [`Worker::listen`]
/// yields what the worker posts back to its parent.
pub struct Worker<M: StructuredClone> {
    parent: ExecutionContext,
    scope: Inbox<M>,
    scope_label: String,
    mailbox: Mailbox<M>,
}

/// Worker-side endpoint addressing the parent's [`Worker`] object.
pub struct WorkerParent<M: StructuredClone> {
    label: String,
    inbox: Inbox<M>,
}

impl<M: StructuredClone> Worker<M> {
    pub(crate) fn new(
        parent: ExecutionContext,
        scope: Inbox<M>,
        scope_label: impl Into<String>,
    ) -> (Self, WorkerParent<M>) {
        let scope_label = scope_label.into();
        let mailbox = Mailbox::new(format!("worker:{}", scope_label));
        let back = WorkerParent {
            label: format!("parent-of:{}", scope_label),
            inbox: mailbox.inbox(),
        };
        (
            Self {
                parent,
                scope,
                scope_label,
                mailbox,
            },
            back,
        )
    }

    pub fn listen(&self) -> TransportResult<EventReceiver<M>> {
        self.mailbox.listen(self.parent.clone())
    }
}

impl<M: StructuredClone> MessageTarget<M> for Worker<M> {
    fn post_message(&self, message: &M, options: PostOptions<M>) -> TransportResult<()> {
        let delivery = Delivery::new(message, "", None, options.transfer)?;
        deliver(&self.scope, &self.scope_label, delivery);
        Ok(())
    }

    fn label(&self) -> String {
        format!("worker:{}", self.scope_label)
    }
}

impl<M: StructuredClone> MessageTarget<M> for WorkerParent<M> {
    fn post_message(&self, message: &M, options: PostOptions<M>) -> TransportResult<()> {
        let delivery = Delivery::new(message, "", None, options.transfer)?;
        deliver(&self.inbox, &self.label, delivery);
        Ok(())
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}
