use async_trait::async_trait;
use chrono::{Duration, NaiveDate, SecondsFormat, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::Serialize;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub company: String,
    pub job_title: String,
    pub language: String,
    pub timezone: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub address: Address,
    pub profile: UserProfile,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub payment_method: String,
    pub masked_card_number: String,
    pub card_type: String,
    pub payment_status: String,
    pub transaction_id: String,
    pub processor: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub total_amount: f64,
    pub currency: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_info: PaymentInfo,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub price: f64,
    pub description: String,
    pub in_stock: bool,
}

/// Source of synthetic records for tools and resources.
#[async_trait]
pub trait DataGenerator: Send + Sync {
    async fn generate_users(&self, count: usize) -> Result<Vec<User>, AppError>;
    async fn generate_orders(&self, count: usize) -> Result<Vec<Order>, AppError>;
    async fn generate_products(&self, count: usize) -> Result<Vec<Product>, AppError>;
}

const FIRST_NAMES: [&str; 12] = [
    "Olivia", "Liam", "Emma", "Noah", "Ava", "Mateo", "Sofia", "Lucas", "Mia", "Ethan", "Priya",
    "Kenji",
];
const LAST_NAMES: [&str; 12] = [
    "Smith", "Johnson", "Garcia", "Brown", "Nguyen", "Patel", "Miller", "Davis", "Lopez",
    "Wilson", "Tanaka", "Okafor",
];
const STREETS: [&str; 8] = [
    "Maple Ave", "Oak St", "Pine Rd", "Cedar Ln", "Elm St", "Birch Blvd", "Willow Way",
    "Lakeview Dr",
];
const CITIES: [(&str, &str); 8] = [
    ("Austin", "TX"),
    ("Denver", "CO"),
    ("Seattle", "WA"),
    ("Boston", "MA"),
    ("Chicago", "IL"),
    ("Portland", "OR"),
    ("Atlanta", "GA"),
    ("Phoenix", "AZ"),
];
const COMPANIES: [&str; 6] = [
    "Acme Corp", "Globex", "Initech", "Umbrella Labs", "Stark Industries", "Wayne Enterprises",
];
const JOB_TITLES: [&str; 6] = [
    "QA Engineer", "Software Engineer", "Product Manager", "Data Analyst", "DevOps Engineer",
    "Support Specialist",
];
const LANGUAGES: [&str; 5] = ["English", "Spanish", "German", "Japanese", "Hindi"];
const TIMEZONES: [&str; 5] = ["UTC", "EST", "PST", "GMT", "CET"];
const ORDER_STATUSES: [&str; 6] = [
    "pending", "confirmed", "processing", "shipped", "delivered", "cancelled",
];
const PAYMENT_METHODS: [&str; 6] = [
    "credit_card", "debit_card", "paypal", "apple_pay", "google_pay", "bank_transfer",
];
const CARD_TYPES: [&str; 4] = ["Visa", "MasterCard", "American Express", "Discover"];
const PAYMENT_STATUSES: [&str; 4] = ["pending", "completed", "failed", "refunded"];
const PROCESSORS: [&str; 4] = ["Stripe", "PayPal", "Square", "Braintree"];
const CURRENCIES: [&str; 5] = ["USD", "EUR", "GBP", "CAD", "AUD"];
const CATEGORIES: [&str; 8] = [
    "Electronics", "Clothing", "Books", "Home & Garden", "Sports", "Toys", "Beauty", "Food",
];
const PRODUCT_ADJECTIVES: [&str; 6] = ["Smart", "Classic", "Portable", "Premium", "Eco", "Compact"];
const PRODUCT_NOUNS: [&str; 6] = ["Speaker", "Backpack", "Lamp", "Headphones", "Kettle", "Watch"];

/// Random record generator. A seeded instance yields the same records on every call.
#[derive(Debug, Clone, Default)]
pub struct FakeDataGenerator {
    seed: Option<u64>,
}

impl FakeDataGenerator {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn users(&self, count: usize) -> Vec<User> {
        let mut rng = self.rng();
        (0..count).map(|_| random_user(&mut rng)).collect()
    }

    pub fn orders(&self, count: usize) -> Vec<Order> {
        let mut rng = self.rng();
        (0..count)
            .map(|_| {
                let user_id = random_user_id(&mut rng);
                random_order(&mut rng, user_id)
            })
            .collect()
    }

    pub fn products(&self, count: usize) -> Vec<Product> {
        let mut rng = self.rng();
        (0..count)
            .map(|index| random_product(&mut rng, index as u32 + 1))
            .collect()
    }
}

#[async_trait]
impl DataGenerator for FakeDataGenerator {
    async fn generate_users(&self, count: usize) -> Result<Vec<User>, AppError> {
        Ok(self.users(count))
    }

    async fn generate_orders(&self, count: usize) -> Result<Vec<Order>, AppError> {
        Ok(self.orders(count))
    }

    async fn generate_products(&self, count: usize) -> Result<Vec<Product>, AppError> {
        Ok(self.products(count))
    }
}

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

fn digits(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn money(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    round_cents(rng.gen_range(min..max))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn random_user_id(rng: &mut StdRng) -> String {
    format!("user_{:08x}", rng.gen::<u32>())
}

fn timestamp_within_days(rng: &mut StdRng, days: i64) -> String {
    let offset = Duration::minutes(rng.gen_range(0..days * 24 * 60));
    (Utc::now() - offset).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn random_address(rng: &mut StdRng, kind: &str) -> Address {
    let (city, state) = CITIES.choose(rng).copied().unwrap_or(("Austin", "TX"));
    Address {
        street: format!("{} {}", rng.gen_range(1..9999), pick(rng, &STREETS)),
        city: city.to_string(),
        state: state.to_string(),
        postal_code: digits(rng, 5),
        country: "United States".to_string(),
        kind: kind.to_string(),
    }
}

fn random_user(rng: &mut StdRng) -> User {
    let first_name = pick(rng, &FIRST_NAMES).to_string();
    let last_name = pick(rng, &LAST_NAMES).to_string();
    let user_id = random_user_id(rng);
    let email = format!(
        "{}.{}{}@example.com",
        first_name.to_ascii_lowercase(),
        last_name.to_ascii_lowercase(),
        rng.gen_range(1..1000)
    );
    let date_of_birth = NaiveDate::from_ymd_opt(
        rng.gen_range(1950..2006),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    )
    .map(|date| date.format("%Y-%m-%d").to_string())
    .unwrap_or_default();

    User {
        email,
        phone_number: format!("+1-{}-{}-{}", digits(rng, 3), digits(rng, 3), digits(rng, 4)),
        date_of_birth,
        address: random_address(rng, "home"),
        profile: UserProfile {
            company: pick(rng, &COMPANIES).to_string(),
            job_title: pick(rng, &JOB_TITLES).to_string(),
            language: pick(rng, &LANGUAGES).to_string(),
            timezone: pick(rng, &TIMEZONES).to_string(),
            avatar_url: format!("https://i.pravatar.cc/150?u={}", &user_id[5..]),
        },
        created_at: timestamp_within_days(rng, 365),
        user_id,
        first_name,
        last_name,
    }
}

fn random_item(rng: &mut StdRng) -> OrderItem {
    let quantity = rng.gen_range(1..5);
    let unit_price = money(rng, 5.0, 500.0);
    OrderItem {
        product_id: format!("prod_{}", digits(rng, 6)),
        product_name: format!(
            "{} {}",
            pick(rng, &PRODUCT_ADJECTIVES),
            pick(rng, &PRODUCT_NOUNS)
        ),
        sku: format!("SKU-{}", digits(rng, 8)),
        quantity,
        unit_price,
        total_price: round_cents(unit_price * f64::from(quantity)),
        category: pick(rng, &CATEGORIES).to_string(),
    }
}

fn random_order(rng: &mut StdRng, user_id: String) -> Order {
    let items: Vec<OrderItem> = (0..rng.gen_range(1..6)).map(|_| random_item(rng)).collect();
    let total_amount = round_cents(items.iter().map(|item| item.total_price).sum());

    Order {
        order_id: format!("order_{}", digits(rng, 8)),
        user_id,
        status: pick(rng, &ORDER_STATUSES).to_string(),
        total_amount,
        currency: pick(rng, &CURRENCIES).to_string(),
        items,
        shipping_address: random_address(rng, "shipping"),
        billing_address: random_address(rng, "billing"),
        payment_info: PaymentInfo {
            payment_method: pick(rng, &PAYMENT_METHODS).to_string(),
            masked_card_number: format!("****-****-****-{}", digits(rng, 4)),
            card_type: pick(rng, &CARD_TYPES).to_string(),
            payment_status: pick(rng, &PAYMENT_STATUSES).to_string(),
            transaction_id: format!("txn_{:012x}", rng.gen::<u64>() & 0xffff_ffff_ffff),
            processor: pick(rng, &PROCESSORS).to_string(),
        },
        created_at: timestamp_within_days(rng, 90),
    }
}

fn random_product(rng: &mut StdRng, id: u32) -> Product {
    Product {
        id,
        name: format!(
            "{} {}",
            pick(rng, &PRODUCT_ADJECTIVES),
            pick(rng, &PRODUCT_NOUNS)
        ),
        sku: format!("SKU-{}", digits(rng, 8)),
        category: pick(rng, &CATEGORIES).to_string(),
        price: money(rng, 9.99, 999.99),
        description: "High-quality sample product for testing".to_string(),
        in_stock: rng.gen_bool(0.85),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_counts() {
        let generator = FakeDataGenerator::new();

        assert_eq!(generator.users(3).len(), 3);
        assert_eq!(generator.orders(0).len(), 0);
        assert_eq!(generator.products(7).len(), 7);
    }

    #[test]
    fn order_totals_match_items() {
        for order in FakeDataGenerator::seeded(11).orders(20) {
            assert!(!order.items.is_empty());
            let sum: f64 = order.items.iter().map(|item| item.total_price).sum();
            assert!((order.total_amount - sum).abs() < 0.01);
        }
    }

    #[test]
    fn seeded_generator_is_deterministic_apart_from_timestamps() {
        let first = FakeDataGenerator::seeded(42).users(4);
        let second = FakeDataGenerator::seeded(42).users(4);

        let ids = |users: &[User]| {
            users
                .iter()
                .map(|user| (user.user_id.clone(), user.email.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn user_serializes_with_camel_case_fields() {
        let user = FakeDataGenerator::seeded(1).users(1).remove(0);
        let value = serde_json::to_value(&user).expect("serializes");

        assert!(value["userId"].as_str().is_some_and(|id| id.starts_with("user_")));
        assert_eq!(value["address"]["type"], "home");
        assert!(value["email"].as_str().is_some_and(|email| email.contains('@')));
    }

    #[test]
    fn products_are_numbered_from_one() {
        let products = FakeDataGenerator::seeded(3).products(3);
        let ids: Vec<u32> = products.iter().map(|product| product.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
