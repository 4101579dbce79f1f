use crate::domain::ports::{ConsumeListenerRef, PurchaseListenerRef};
use crate::error::BillingError;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// An operation waiting for the billing service connection.
pub enum PendingOperation {
    Purchase {
        product_id: String,
        listener: PurchaseListenerRef,
    },
    Query {
        product_id: String,
        listener: PurchaseListenerRef,
    },
    Consume {
        purchase_token: String,
        listener: ConsumeListenerRef,
        retried: bool,
    },
}

impl PendingOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Purchase { .. } => "purchase",
            Self::Query { .. } => "query",
            Self::Consume { .. } => "consume",
        }
    }

    /// Reports `error` to whoever is waiting on this operation.
    pub fn fail(self, error: &BillingError) {
        match self {
            Self::Purchase { listener, .. } | Self::Query { listener, .. } => {
                listener.on_payments_error(error)
            }
            Self::Consume {
                purchase_token,
                listener,
                ..
            } => listener.on_item_consumed(error.category(), &purchase_token),
        }
    }
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purchase { product_id, .. } | Self::Query { product_id, .. } => f
                .debug_struct(self.kind())
                .field("product_id", product_id)
                .finish(),
            Self::Consume {
                purchase_token,
                retried,
                ..
            } => f
                .debug_struct(self.kind())
                .field("purchase_token", purchase_token)
                .field("retried", retried)
                .finish(),
        }
    }
}

/// Bounded FIFO of operations deferred until the connection is up.
#[derive(Debug)]
pub struct PendingQueue {
    operations: VecDeque<PendingOperation>,
    capacity: usize,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            operations: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `op`, handing it back when the queue is full.
    pub fn push(&mut self, op: PendingOperation) -> Result<(), PendingOperation> {
        if self.operations.len() >= self.capacity {
            return Err(op);
        }
        self.operations.push_back(op);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<PendingOperation> {
        self.operations.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PendingOperation> + '_ {
        self.operations.drain(..)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
