//! Outbound notification contract.
//!
//! Email delivery is an external collaborator; this module states the
//! contract and hands the message to the transport configured for the
//! deployment (currently the structured log, which downstream shipping
//! picks up). Failures here are never fatal to the request that raised
//! them — call sites log and move on.

use thiserror::Error;

use crate::models::{Feedback, Order, OrderItem};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

#[derive(Clone)]
pub struct Notifier {
    admin_email: String,
    store_name: String,
}

impl Notifier {
    pub fn new(admin_email: String, store_name: String) -> Self {
        Notifier {
            admin_email,
            store_name,
        }
    }

    pub fn order_created(&self, order: &Order, items: &[OrderItem]) -> Result<(), NotifyError> {
        tracing::info!(
            to = %self.admin_email,
            subject = %format!("New Order Received - {}", order.order_number),
            order_number = %order.order_number,
            total_amount = order.total_amount,
            item_count = items.len(),
            "notify.admin.order"
        );
        Ok(())
    }

    pub fn order_confirmation(
        &self,
        order: &Order,
        customer_email: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            to = %customer_email,
            from = %self.store_name,
            subject = %format!("Order Confirmation - {}", order.order_number),
            total_amount = order.total_amount,
            "notify.customer.order"
        );
        Ok(())
    }

    pub fn feedback_received(&self, feedback: &Feedback) -> Result<(), NotifyError> {
        let plural = if feedback.stars == 1 { "" } else { "s" };
        tracing::info!(
            to = %self.admin_email,
            subject = %format!("New Feedback Received - {} Star{plural}", feedback.stars),
            from_name = %feedback.name,
            "notify.admin.feedback"
        );
        Ok(())
    }

    pub fn contact_message(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            to = %self.admin_email,
            subject = %format!("New Contact Form Submission from {name}"),
            reply_to = %email,
            body_len = message.len(),
            "notify.admin.contact"
        );
        Ok(())
    }
}
