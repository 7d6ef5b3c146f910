pub mod addresses;
pub mod cart_items;
pub mod carts;
pub mod customers;
pub mod order_items;
pub mod orders;
pub mod product_images;
pub mod products;
pub mod users;
pub mod vendors;

pub use addresses::Entity as Addresses;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use customers::Entity as Customers;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use users::Entity as Users;
pub use vendors::Entity as Vendors;
