use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored user document. Addresses, cart and orders are embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, with = "optional_bson_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_bson_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: AddressBook,
    #[serde(default)]
    pub usercart: Vec<ProductUser>,
    #[serde(default)]
    pub cart_version: i64,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl User {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        let id = ObjectId::new();
        let now = Utc::now();
        Self {
            id,
            user_id: id.to_hex(),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            email: Some(email.to_string()),
            phone: None,
            token: None,
            refresh_token: None,
            created_at: Some(now),
            updated_at: Some(now),
            address: AddressBook::default(),
            usercart: Vec::new(),
            cart_version: 0,
            orders: Vec::new(),
        }
    }
}

/// The two address roles a user may fill. Home was slot 0, work slot 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSlot {
    Home,
    Work,
}

impl AddressSlot {
    /// Fill order used when adding an address.
    pub const ALL: [AddressSlot; 2] = [AddressSlot::Home, AddressSlot::Work];

    pub fn field(&self) -> &'static str {
        match self {
            AddressSlot::Home => "home",
            AddressSlot::Work => "work",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AddressBook {
    #[serde(default)]
    pub home: Option<Address>,
    #[serde(default)]
    pub work: Option<Address>,
}

impl AddressBook {
    pub const CAPACITY: usize = 2;

    pub fn count(&self) -> usize {
        usize::from(self.home.is_some()) + usize::from(self.work.is_some())
    }

    pub fn get(&self, slot: AddressSlot) -> Option<&Address> {
        match slot {
            AddressSlot::Home => self.home.as_ref(),
            AddressSlot::Work => self.work.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: AddressSlot) -> &mut Option<Address> {
        match slot {
            AddressSlot::Home => &mut self.home,
            AddressSlot::Work => &mut self.work,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(rename = "_id")]
    pub address_id: ObjectId,
    #[serde(default)]
    pub house_name: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub pin_code: Option<String>,
}

/// Partial address update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressEdit {
    pub house_name: Option<String>,
    pub street_name: Option<String>,
    pub city_name: Option<String>,
    pub pin_code: Option<String>,
}

impl AddressEdit {
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    /// Provided fields as `(stored field name, value)` pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("house_name", self.house_name.as_deref()),
            ("street_name", self.street_name.as_deref()),
            ("city_name", self.city_name.as_deref()),
            ("pin_code", self.pin_code.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }

    pub fn apply(&self, address: &mut Address) {
        if let Some(v) = &self.house_name {
            address.house_name = Some(v.clone());
        }
        if let Some(v) = &self.street_name {
            address.street_name = Some(v.clone());
        }
        if let Some(v) = &self.city_name {
            address.city_name = Some(v.clone());
        }
        if let Some(v) = &self.pin_code {
            address.pin_code = Some(v.clone());
        }
    }

    pub fn into_address(self) -> Address {
        Address {
            address_id: ObjectId::new(),
            house_name: self.house_name,
            street_name: self.street_name,
            city_name: self.city_name,
            pin_code: self.pin_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(rename = "_id")]
    pub product_id: ObjectId,
    pub product_name: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Cart line: a value copy of a product taken when it was added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductUser {
    #[serde(rename = "_id")]
    pub product_id: ObjectId,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<Product> for ProductUser {
    fn from(product: Product) -> Self {
        Self {
            product_id: product.product_id,
            product_name: Some(product.product_name),
            price: product.price,
            rating: product.rating,
            image: product.image,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub digital: bool,
    pub cod: bool,
}

impl Payment {
    pub fn cash_on_delivery() -> Self {
        Self {
            digital: false,
            cod: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    #[serde(rename = "_id")]
    pub order_id: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub ordered_at: DateTime<Utc>,
    #[serde(default)]
    pub order_list: Vec<ProductUser>,
    pub price: i64,
    #[serde(default)]
    pub discount: Option<i64>,
    pub payment_method: Payment,
}

impl Order {
    /// A cash-on-delivery order stamped with a fresh id and the current time.
    pub fn cash_on_delivery(price: i64, order_list: Vec<ProductUser>) -> Self {
        Self {
            order_id: ObjectId::new(),
            ordered_at: Utc::now(),
            order_list,
            price,
            discount: None,
            payment_method: Payment::cash_on_delivery(),
        }
    }
}

/// Cart contents, their total and the cart version, read in one aggregation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<ProductUser>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: Option<String>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// bson's chrono helper only covers the non-optional case.
mod optional_bson_datetime {
    use bson::DateTime as BsonDateTime;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(BsonDateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<BsonDateTime>::deserialize(deserializer)?;
        Ok(value.map(BsonDateTime::to_chrono))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_book_counts_filled_slots() {
        let mut book = AddressBook::default();
        assert_eq!(book.count(), 0);

        *book.slot_mut(AddressSlot::Work) = Some(AddressEdit::default().into_address());
        assert_eq!(book.count(), 1);
        assert!(book.get(AddressSlot::Home).is_none());
        assert!(book.get(AddressSlot::Work).is_some());
    }

    #[test]
    fn address_edit_only_touches_provided_fields() {
        let mut address = AddressEdit {
            house_name: Some("12".into()),
            street_name: Some("Main St".into()),
            city_name: Some("Lisbon".into()),
            pin_code: Some("1000".into()),
        }
        .into_address();

        let edit = AddressEdit {
            city_name: Some("Porto".into()),
            ..Default::default()
        };
        edit.apply(&mut address);

        assert_eq!(address.city_name.as_deref(), Some("Porto"));
        assert_eq!(address.street_name.as_deref(), Some("Main St"));
        assert_eq!(edit.fields().collect::<Vec<_>>(), vec![("city_name", "Porto")]);
        assert!(AddressEdit::default().is_empty());
    }

    #[test]
    fn user_round_trips_through_bson() {
        let mut user = User::new("Ada", "Lovelace", "ada@example.com");
        user.orders.push(Order::cash_on_delivery(0, Vec::new()));

        let doc = bson::to_document(&user).expect("encode");
        let decoded: User = bson::from_document(doc).expect("decode");
        assert_eq!(decoded.id, user.id);
        assert_eq!(decoded.orders.len(), 1);
        assert!(decoded.orders[0].payment_method.cod);
    }
}
