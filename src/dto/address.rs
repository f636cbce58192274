use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Address, AddressBook, AddressEdit};

/// Address fields as sent by clients. Short aliases are accepted.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AddressRequest {
    #[serde(default, alias = "house")]
    pub house_name: Option<String>,
    #[serde(default, alias = "street")]
    pub street_name: Option<String>,
    #[serde(default, alias = "city")]
    pub city_name: Option<String>,
    #[serde(default, alias = "pincode")]
    pub pin_code: Option<String>,
}

impl From<AddressRequest> for AddressEdit {
    fn from(req: AddressRequest) -> Self {
        Self {
            house_name: req.house_name,
            street_name: req.street_name,
            city_name: req.city_name,
            pin_code: req.pin_code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressDto {
    pub id: String,
    pub house_name: Option<String>,
    pub street_name: Option<String>,
    pub city_name: Option<String>,
    pub pin_code: Option<String>,
}

impl From<Address> for AddressDto {
    fn from(address: Address) -> Self {
        Self {
            id: address.address_id.to_hex(),
            house_name: address.house_name,
            street_name: address.street_name,
            city_name: address.city_name,
            pin_code: address.pin_code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressBookDto {
    pub home: Option<AddressDto>,
    pub work: Option<AddressDto>,
}

impl From<AddressBook> for AddressBookDto {
    fn from(book: AddressBook) -> Self {
        Self {
            home: book.home.map(AddressDto::from),
            work: book.work.map(AddressDto::from),
        }
    }
}
