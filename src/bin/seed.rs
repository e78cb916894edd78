//! Demo data seeding tool
//!
//! Run with: cargo run --bin seed
//!
//! Uses the store selected by STORE / DATABASE_URL. With the in-memory
//! store the data only lives for the run, which is still useful as a
//! smoke test of the handlers.

use rust_decimal::Decimal;
use uuid::Uuid;

use purchase_ledger::domain::OperationContext;
use purchase_ledger::handlers::{
    ClientHandler, CreateClientCommand, CreatePaymentCommand, CreatePurchaseCommand, NewPayment,
    PaymentHandler, PurchaseHandler,
};
use purchase_ledger::model::Entity;
use purchase_ledger::{db, Config, Purchase};

struct Seeder {
    clients: ClientHandler,
    purchases: PurchaseHandler,
    payments: PaymentHandler,
    context: OperationContext,
}

impl Seeder {
    async fn client(&self, name: &str, nickname: &str, phone: &str, email: &str) -> anyhow::Result<Uuid> {
        let command = CreateClientCommand::new(name)
            .with_nickname(nickname)
            .with_phone(phone)
            .with_email(email);

        let client = self.clients.create(command, &self.context).await?;
        println!("Client created: {} (id={})", client.name(), client.id());
        Ok(client.id())
    }

    async fn purchase(
        &self,
        client_id: Uuid,
        description: &str,
        total_value: i64,
        paid_now: i64,
        note_number: &str,
        method: &str,
    ) -> anyhow::Result<Purchase> {
        let mut command = CreatePurchaseCommand::new(client_id, description, Decimal::from(total_value))
            .with_note_number(note_number);

        if paid_now > 0 {
            let suffix = note_number.rsplit('-').next().unwrap_or(note_number);
            command = command.with_initial_payment(
                NewPayment::new(Decimal::from(paid_now), method)
                    .with_receipt_number(format!("REC-{}", suffix)),
            );
        }

        let result = self.purchases.create(command, &self.context).await?;
        let purchase = result.purchase;
        println!(
            "Purchase created: {} (total={}, paid={}, {})",
            note_number,
            purchase.total_value(),
            purchase.total_paid_value(),
            purchase.status()
        );
        Ok(purchase)
    }

    async fn payment(
        &self,
        purchase_id: Uuid,
        amount: i64,
        method: &str,
        description: &str,
        receipt_number: &str,
    ) -> anyhow::Result<()> {
        let payment = NewPayment::new(Decimal::from(amount), method)
            .with_description(description)
            .with_receipt_number(receipt_number);

        let result = self
            .payments
            .create(CreatePaymentCommand::new(purchase_id, payment), &self.context)
            .await?;

        println!(
            "Payment created: {} (amount={}, purchase now {})",
            receipt_number,
            result.payment.amount(),
            result.purchase.status()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "purchase_ledger=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let (store, pool) = db::open_store(&config).await?;

    let seeder = Seeder {
        clients: ClientHandler::new(store.clone()),
        purchases: PurchaseHandler::new(store.clone()),
        payments: PaymentHandler::new(store),
        context: OperationContext::new().with_correlation_id(Uuid::new_v4()),
    };

    println!("Seeding demo data...");

    let joao = seeder
        .client("João Silva", "joao", "11999999999", "joao@email.com")
        .await?;
    let maria = seeder
        .client("Maria Souza", "maria", "11988888888", "maria@email.com")
        .await?;
    seeder
        .client("Carlos Lima", "carlos", "21977777777", "carlos@email.com")
        .await?;

    let seeds = seeder
        .purchase(joao, "Compra de sementes", 100, 50, "NF-0001", "Pix")
        .await?;
    seeder
        .purchase(joao, "Compra de ferramentas", 300, 300, "NF-0002", "Cartão")
        .await?;
    seeder
        .purchase(maria, "Compra de adubo", 200, 0, "NF-0003", "Dinheiro")
        .await?;

    seeder
        .payment(seeds.id(), 50, "Pix", "Segunda parcela", "REC-0004")
        .await?;

    println!("Seed complete.");

    if let Some(pool) = pool {
        pool.close().await;
    }

    Ok(())
}
