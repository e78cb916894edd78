//! Purchase Aggregator
//!
//! Derives a purchase's paid total and status from its live payments, and
//! persists the result inside the caller's unit of work.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{DomainError, ErrorCode, Money};
use crate::model::{Entity, Payment, Purchase, Settlement};
use crate::store::LedgerTx;

/// Recompute the settlement of a purchase.
///
/// Only active payments recorded against this purchase count, so the full
/// payment list may be passed in. An inactive purchase keeps its current
/// settlement.
pub fn recompute(purchase: &Purchase, payments: &[Payment]) -> Settlement {
    if !purchase.is_active() {
        return purchase.settlement();
    }

    let paid: Money = payments
        .iter()
        .filter(|payment| payment.is_active() && payment.belongs_to(purchase.id()))
        .map(|payment| &payment.amount)
        .sum();

    Settlement::from_paid(paid, &purchase.total_value())
}

/// Reload a purchase under lock, recompute its settlement from the active
/// payments and write it back. Inactive purchases are returned untouched.
pub async fn settle_purchase(
    tx: &mut dyn LedgerTx,
    purchase_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Purchase, DomainError> {
    let mut purchase = tx
        .get_purchase(purchase_id)
        .await?
        .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

    if !purchase.is_active() {
        tracing::debug!("Purchase {} is inactive, settlement unchanged", purchase_id);
        return Ok(purchase);
    }

    let payments = tx.active_payments(purchase_id).await?;
    let settlement = recompute(&purchase, &payments);
    purchase.apply_settlement(settlement, now);

    if let Some(excess) = purchase.overpayment() {
        tracing::warn!(
            "Purchase {} overpaid by {} (total {}, paid {})",
            purchase_id,
            excess,
            purchase.total_value(),
            purchase.total_paid_value()
        );
    }

    tx.update_purchase(&purchase).await?;

    tracing::debug!(
        "Purchase {} settled: {} paid, status {}",
        purchase_id,
        purchase.total_paid_value(),
        purchase.status()
    );

    Ok(purchase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Amount;
    use crate::model::{PaymentDraft, PurchaseStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn purchase(total: Decimal) -> Purchase {
        Purchase::create(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Notebook",
            Amount::new(total).unwrap(),
            None,
            Utc::now(),
        )
    }

    fn payment(purchase_id: Uuid, amount: Decimal) -> Payment {
        Payment::create(
            Uuid::new_v4(),
            purchase_id,
            PaymentDraft::new(Amount::new(amount).unwrap(), "Pix"),
            Utc::now(),
        )
    }

    #[test]
    fn test_recompute_sums_active_payments() {
        let purchase = purchase(dec!(100));
        let payments = vec![payment(purchase.id(), dec!(20.10)), payment(purchase.id(), dec!(29.90))];

        let settlement = recompute(&purchase, &payments);

        assert_eq!(settlement.total_paid_value.value(), dec!(50));
        assert_eq!(settlement.status, PurchaseStatus::Partial);
    }

    #[test]
    fn test_recompute_ignores_inactive_and_foreign_payments() {
        let purchase = purchase(dec!(100));
        let mut inactive = payment(purchase.id(), dec!(60));
        inactive.set_active(false, Utc::now());
        let foreign = payment(Uuid::new_v4(), dec!(100));

        let settlement = recompute(&purchase, &[inactive, foreign]);

        assert_eq!(settlement, Settlement::unpaid());
    }

    #[test]
    fn test_recompute_overpayment_is_paid() {
        let purchase = purchase(dec!(100));
        let payments = vec![payment(purchase.id(), dec!(50)), payment(purchase.id(), dec!(60))];

        let settlement = recompute(&purchase, &payments);

        assert_eq!(settlement.total_paid_value.value(), dec!(110));
        assert_eq!(settlement.status, PurchaseStatus::Paid);
    }

    #[test]
    fn test_recompute_inactive_purchase_is_noop() {
        let mut purchase = purchase(dec!(100));
        let now = Utc::now();
        purchase.apply_settlement(
            Settlement::from_paid(Money::new(dec!(30)).unwrap(), &purchase.total_value()),
            now,
        );
        purchase.set_active(false, now);

        let settlement = recompute(&purchase, &[payment(purchase.id(), dec!(100))]);

        assert_eq!(settlement, purchase.settlement());
    }

    #[test]
    fn test_recompute_no_payments_is_pending() {
        let purchase = purchase(dec!(100));
        assert_eq!(recompute(&purchase, &[]), Settlement::unpaid());
    }
}
