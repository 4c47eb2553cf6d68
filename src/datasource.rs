//! Demo data generation.
//!
//! The composition pipeline never depends on this module: any
//! [`InvoiceSource`] can feed [`InvoiceDocument`](crate::invoice::InvoiceDocument).

use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{Address, InvoiceModel, OrderItem};

/// Supplies populated invoice models.
pub trait InvoiceSource {
    fn next_invoice(&mut self) -> InvoiceModel;
}

/// Number of order items the demo generates by default.
pub const DEFAULT_ITEM_COUNT: usize = 8;

/// Days between issue and due date.
pub const PAYMENT_TERM_DAYS: i64 = 14;

/// Random invoice generator.
///
/// Seeded from the OS by [`from_entropy`](Self::from_entropy) or with an
/// explicit seed for reproducible output.
pub struct RandomInvoiceSource {
    rng: StdRng,
    item_count: usize,
    issue_date: Option<NaiveDate>,
}

impl RandomInvoiceSource {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            item_count: DEFAULT_ITEM_COUNT,
            issue_date: None,
        }
    }

    /// Seed from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            item_count: DEFAULT_ITEM_COUNT,
            issue_date: None,
        }
    }

    pub fn item_count(mut self, count: usize) -> Self {
        self.item_count = count;
        self
    }

    /// Pin the issue date instead of using today's date.
    pub fn issued_on(mut self, date: NaiveDate) -> Self {
        self.issue_date = Some(date);
        self
    }

    fn order_item(&mut self) -> OrderItem {
        OrderItem {
            name: placeholders::label(&mut self.rng),
            unit_price: self.rng.gen_range(0..=10_000),
            quantity: self.rng.gen_range(1..10),
        }
    }

    fn address(&mut self) -> Address {
        Address {
            company_name: Some(placeholders::name(&mut self.rng)),
            street: Some(placeholders::label(&mut self.rng)),
            city: Some(placeholders::label(&mut self.rng)),
            state: Some(placeholders::label(&mut self.rng)),
            email: Some(placeholders::email(&mut self.rng)),
            phone: Some(placeholders::phone_number(&mut self.rng)),
        }
    }
}

impl InvoiceSource for RandomInvoiceSource {
    fn next_invoice(&mut self) -> InvoiceModel {
        let issue_date = self
            .issue_date
            .unwrap_or_else(|| Local::now().date_naive());
        let items = (0..self.item_count).map(|_| self.order_item()).collect();

        InvoiceModel {
            invoice_number: self.rng.gen_range(1_000..10_000),
            issue_date,
            due_date: issue_date + Duration::days(PAYMENT_TERM_DAYS),
            seller_address: self.address(),
            customer_address: self.address(),
            items,
            comments: placeholders::paragraph(&mut self.rng),
        }
    }
}

/// Lorem-ipsum style placeholder text.
pub mod placeholders {
    use rand::seq::SliceRandom;
    use rand::Rng;

    const WORDS: &[&str] = &[
        "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed",
        "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna",
        "aliqua", "enim", "ad", "minim", "veniam", "quis", "nostrud", "exercitation",
        "ullamco", "laboris", "nisi", "aliquip", "ex", "ea", "commodo", "consequat", "duis",
        "aute", "irure", "in", "reprehenderit", "voluptate", "velit", "esse", "cillum",
        "fugiat", "nulla", "pariatur", "excepteur", "sint", "occaecat", "cupidatat", "non",
        "proident", "sunt", "culpa", "qui", "officia", "deserunt", "mollit", "anim", "id",
        "est", "laborum",
    ];

    const FIRST_NAMES: &[&str] = &[
        "Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Avery", "Quinn", "Jamie",
        "Robin", "Sam", "Charlie",
    ];

    const LAST_NAMES: &[&str] = &[
        "Smith", "Novak", "Garcia", "Kowalski", "Tanaka", "Okafor", "Larsen", "Moreau",
        "Silva", "Fischer", "Khan", "Walsh",
    ];

    const DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

    fn capitalize(word: &str) -> String {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn pick(rng: &mut impl Rng, words: &[&'static str]) -> &'static str {
        words.choose(rng).copied().unwrap_or_default()
    }

    fn words(rng: &mut impl Rng, count: usize) -> Vec<&'static str> {
        (0..count).map(|_| pick(rng, WORDS)).collect()
    }

    /// Two to four capitalised words.
    pub fn label(rng: &mut impl Rng) -> String {
        let count = rng.gen_range(2..5);
        capitalize(&words(rng, count).join(" "))
    }

    pub fn name(rng: &mut impl Rng) -> String {
        format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
    }

    pub fn email(rng: &mut impl Rng) -> String {
        format!(
            "{}.{}@{}",
            pick(rng, FIRST_NAMES).to_lowercase(),
            pick(rng, LAST_NAMES).to_lowercase(),
            pick(rng, DOMAINS)
        )
    }

    pub fn phone_number(rng: &mut impl Rng) -> String {
        format!(
            "{:03}-{:03}-{:04}",
            rng.gen_range(200..1000),
            rng.gen_range(200..1000),
            rng.gen_range(0..10_000)
        )
    }

    pub fn sentence(rng: &mut impl Rng) -> String {
        let count = rng.gen_range(6..13);
        format!("{}.", capitalize(&words(rng, count).join(" ")))
    }

    /// Three to six sentences.
    pub fn paragraph(rng: &mut impl Rng) -> String {
        let count = rng.gen_range(3..7);
        (0..count)
            .map(|_| sentence(rng))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
