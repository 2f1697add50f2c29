//! In-process [`Store`] used by the test suites and for local development.
//!
//! All tables sit behind one `parking_lot::Mutex`, so every gateway call is
//! atomic. The same uniqueness, foreign-key and stock rules as the
//! `PostgreSQL` schema are enforced here and reported with the same
//! [`RepositoryError`] variants.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use bazaar_core::{
    AddressId, BankAccountId, CartLineId, CategoryId, Email, OrderId, OrderItemId, ProductId,
    Quantity, Role, UserId, VerificationCode,
};

use super::{CartStore, CatalogStore, OrderStore, RepositoryError, Store, UserStore};
use crate::models::{
    Address, AddressPatch, BankAccount, CartLine, Category, NewCartLine, NewCategory, NewOrder,
    NewProduct, NewProfileRecord, NewUser, Order, OrderItem, PendingCode, Product, ProductPatch,
    SellerUpgrade, User, UserPatch,
};

#[derive(Default)]
struct Sequences {
    users: i32,
    addresses: i32,
    bank_accounts: i32,
    categories: i32,
    products: i32,
    cart_lines: i32,
    orders: i32,
    order_items: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<UserId, (User, String)>,
    addresses: BTreeMap<UserId, Address>,
    bank_accounts: BTreeMap<UserId, BankAccount>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    cart_lines: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
}

impl Tables {
    fn user_mut(&mut self, id: UserId) -> Result<&mut User, RepositoryError> {
        self.users
            .get_mut(&id)
            .map(|(user, _)| user)
            .ok_or(RepositoryError::NotFound)
    }

    fn require_user(&self, id: UserId) -> Result<(), RepositoryError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!("user {id} does not exist")))
        }
    }

    fn require_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!("category {id} does not exist")))
        }
    }
}

/// Thread-safe in-memory gateway.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut t = self.tables.lock();
        if t.users.values().any(|(u, _)| u.email == new.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(next(&mut t.seq.users)),
            email: new.email,
            phone: new.phone,
            role: Role::Buyer,
            verified: false,
            pending_code: None,
            first_name: None,
            last_name: None,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(user.id, (user.clone(), new.password_hash));
        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.users.values().find(|(u, _)| &u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, RepositoryError> {
        let mut t = self.tables.lock();
        let user = t.user_mut(id)?;
        if let Some(first_name) = patch.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = Some(last_name);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_verification_code(
        &self,
        id: UserId,
        code: VerificationCode,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock();
        let user = t.user_mut(id)?;
        user.pending_code = Some(PendingCode { code, expires_at });
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock();
        let user = t.user_mut(id)?;
        user.verified = true;
        user.pending_code = None;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn create_profile(
        &self,
        user_id: UserId,
        profile: NewProfileRecord,
    ) -> Result<(User, Address), RepositoryError> {
        let mut t = self.tables.lock();
        t.require_user(user_id)?;
        if t.addresses.contains_key(&user_id) {
            return Err(RepositoryError::Conflict("address already exists".to_owned()));
        }

        let address = Address {
            id: AddressId::new(next(&mut t.seq.addresses)),
            user_id,
            line1: profile.address.line1,
            line2: profile.address.line2,
            city: profile.address.city,
            post_code: profile.address.post_code,
            country: profile.address.country,
        };
        t.addresses.insert(user_id, address.clone());

        let user = t.user_mut(user_id)?;
        user.first_name = Some(profile.first_name);
        user.last_name = Some(profile.last_name);
        user.updated_at = Utc::now();
        Ok((user.clone(), address))
    }

    async fn find_address(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.addresses.get(&user_id).cloned())
    }

    async fn update_address(
        &self,
        user_id: UserId,
        patch: AddressPatch,
    ) -> Result<Address, RepositoryError> {
        let mut t = self.tables.lock();
        let address = t
            .addresses
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;
        apply(&mut address.line1, patch.line1);
        if patch.line2.is_some() {
            address.line2 = patch.line2;
        }
        apply(&mut address.city, patch.city);
        apply(&mut address.post_code, patch.post_code);
        apply(&mut address.country, patch.country);
        Ok(address.clone())
    }

    async fn upgrade_to_seller(
        &self,
        id: UserId,
        upgrade: SellerUpgrade,
    ) -> Result<User, RepositoryError> {
        let mut t = self.tables.lock();

        match t.users.get(&id) {
            Some((user, _)) if user.role == Role::Buyer => {}
            _ => return Err(RepositoryError::Conflict("user is not a buyer".to_owned())),
        }
        let number_taken = t
            .bank_accounts
            .values()
            .any(|b| b.account_number == upgrade.bank_account.account_number);
        if number_taken || t.bank_accounts.contains_key(&id) {
            return Err(RepositoryError::Conflict("bank account already exists".to_owned()));
        }

        let account = BankAccount {
            id: BankAccountId::new(next(&mut t.seq.bank_accounts)),
            user_id: id,
            account_number: upgrade.bank_account.account_number,
            swift_code: upgrade.bank_account.swift_code,
            payment_type: upgrade.bank_account.payment_type,
        };
        t.bank_accounts.insert(id, account);

        let user = t.user_mut(id)?;
        user.first_name = Some(upgrade.first_name);
        user.last_name = Some(upgrade.last_name);
        user.phone = upgrade.phone;
        user.role = Role::Seller;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn find_bank_account(
        &self,
        user_id: UserId,
    ) -> Result<Option<BankAccount>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.bank_accounts.get(&user_id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t
            .cart_lines
            .values()
            .find(|l| l.user_id == user_id && l.product_id == product_id)
            .cloned())
    }

    async fn list_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t
            .cart_lines
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_cart_line(&self, line: NewCartLine) -> Result<CartLine, RepositoryError> {
        let mut t = self.tables.lock();
        t.require_user(line.user_id)?;
        if !t.products.contains_key(&line.product_id) {
            return Err(RepositoryError::Conflict(format!(
                "product {} does not exist",
                line.product_id
            )));
        }
        if t
            .cart_lines
            .values()
            .any(|l| l.user_id == line.user_id && l.product_id == line.product_id)
        {
            return Err(RepositoryError::Conflict("cart line already exists".to_owned()));
        }

        let line = CartLine {
            id: CartLineId::new(next(&mut t.seq.cart_lines)),
            user_id: line.user_id,
            product_id: line.product_id,
            name: line.name,
            image_url: line.image_url,
            price: line.price,
            quantity: line.quantity,
            seller_id: line.seller_id,
        };
        t.cart_lines.insert(line.id, line.clone());
        Ok(line)
    }

    async fn update_cart_line(
        &self,
        id: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let mut t = self.tables.lock();
        let line = t.cart_lines.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    async fn delete_cart_line(&self, id: CartLineId) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock();
        t.cart_lines
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_all_cart_lines(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut t = self.tables.lock();
        let before = t.cart_lines.len();
        t.cart_lines.retain(|_, l| l.user_id != user_id);
        Ok((before - t.cart_lines.len()) as u64)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut t = self.tables.lock();
        t.require_user(order.user_id)?;

        // Validate everything before the first write.
        for item in &order.items {
            let available = t.products.get(&item.product_id).map_or(0, |p| p.stock);
            if available < item.quantity.get() {
                return Err(RepositoryError::InsufficientStock(item.product_id));
            }
        }
        if t.orders.values().any(|o| o.reference == order.reference) {
            return Err(RepositoryError::Conflict("order reference already exists".to_owned()));
        }

        let now = Utc::now();
        for item in &order.items {
            if let Some(product) = t.products.get_mut(&item.product_id) {
                product.stock -= item.quantity.get();
                product.updated_at = now;
            }
        }

        let order_id = OrderId::new(next(&mut t.seq.orders));
        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            items.push(OrderItem {
                id: OrderItemId::new(next(&mut t.seq.order_items)),
                order_id,
                product_id: item.product_id,
                name: item.name,
                image_url: item.image_url,
                price: item.price,
                quantity: item.quantity,
                seller_id: item.seller_id,
            });
        }

        let placed = Order {
            id: order_id,
            user_id: order.user_id,
            reference: order.reference,
            amount: order.amount,
            payment_id: None,
            transaction_id: None,
            items,
            created_at: now,
        };
        t.orders.insert(order_id, placed.clone());
        t.cart_lines.retain(|_, l| l.user_id != order.user_id);
        Ok(placed)
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let t = self.tables.lock();
        let mut orders: Vec<Order> = t
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn find_order(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.orders.get(&id).filter(|o| o.user_id == user_id).cloned())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let mut t = self.tables.lock();
        if let Some(parent_id) = category.parent_id {
            t.require_category(parent_id)?;
        }

        let now = Utc::now();
        let category = Category {
            id: CategoryId::new(next(&mut t.seq.categories)),
            name: category.name,
            parent_id: category.parent_id,
            image_url: category.image_url,
            display_order: category.display_order,
            created_at: now,
            updated_at: now,
        };
        t.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let t = self.tables.lock();
        let mut categories: Vec<Category> = t.categories.values().cloned().collect();
        categories.sort_by_key(|c| (c.display_order, c.id));
        Ok(categories)
    }

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.categories.get(&id).cloned())
    }

    async fn update_category(&self, category: &Category) -> Result<Category, RepositoryError> {
        let mut t = self.tables.lock();
        if let Some(parent_id) = category.parent_id {
            t.require_category(parent_id)?;
        }
        let stored = t
            .categories
            .get_mut(&category.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.name.clone_from(&category.name);
        stored.parent_id = category.parent_id;
        stored.image_url.clone_from(&category.image_url);
        stored.display_order = category.display_order;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock();
        if !t.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        let referenced = t.products.values().any(|p| p.category_id == id)
            || t.categories.values().any(|c| c.parent_id == Some(id));
        if referenced {
            return Err(RepositoryError::Conflict(
                "category references or is referenced by other rows".to_owned(),
            ));
        }
        t.categories.remove(&id);
        Ok(())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut t = self.tables.lock();
        t.require_user(product.seller_id)?;
        t.require_category(product.category_id)?;

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(next(&mut t.seq.products)),
            name: product.name,
            description: product.description,
            category_id: product.category_id,
            image_url: product.image_url,
            price: product.price,
            stock: product.stock,
            seller_id: product.seller_id,
            created_at: now,
            updated_at: now,
        };
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.products.values().cloned().collect())
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t.products.get(&id).cloned())
    }

    async fn list_products_by_seller(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let t = self.tables.lock();
        Ok(t
            .products
            .values()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect())
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let mut t = self.tables.lock();
        if let Some(category_id) = patch.category_id {
            t.require_category(category_id)?;
        }
        let product = t.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply(&mut product.name, patch.name);
        apply(&mut product.description, patch.description);
        if let Some(category_id) = patch.category_id {
            product.category_id = category_id;
        }
        if patch.image_url.is_some() {
            product.image_url = patch.image_url;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn update_stock(&self, id: ProductId, stock: u32) -> Result<Product, RepositoryError> {
        let mut t = self.tables.lock();
        let product = t.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.stock = stock;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock();
        if t.products.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        t.cart_lines.retain(|_, l| l.product_id != id);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{OrderReference, PhoneNumber, Price};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{NewAddress, NewBankAccount, NewOrderItem};

    async fn user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_string(),
                phone: PhoneNumber::parse("+15550100").unwrap(),
            })
            .await
            .unwrap()
    }

    async fn product(store: &MemoryStore, seller: UserId, stock: u32) -> Product {
        let category = store
            .create_category(NewCategory {
                name: "Tea".to_string(),
                parent_id: None,
                image_url: None,
                display_order: 0,
            })
            .await
            .unwrap();
        store
            .create_product(NewProduct {
                seller_id: seller,
                name: "Sencha".to_string(),
                description: String::new(),
                category_id: category.id,
                image_url: None,
                price: Price::new(Decimal::new(1000, 2)).unwrap(),
                stock,
            })
            .await
            .unwrap()
    }

    fn upgrade(account_number: &str) -> SellerUpgrade {
        SellerUpgrade {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: PhoneNumber::parse("+15550101").unwrap(),
            bank_account: NewBankAccount {
                account_number: account_number.to_string(),
                swift_code: "DEUTDEFF".to_string(),
                payment_type: "wire".to_string(),
            },
        }
    }

    fn order_for(user_id: UserId, product: &Product, qty: i64, reference: i32) -> NewOrder {
        let quantity = Quantity::new(qty).unwrap();
        NewOrder {
            user_id,
            reference: OrderReference::new(reference).unwrap(),
            amount: product.price.times(quantity),
            items: vec![NewOrderItem {
                product_id: product.id,
                name: product.name.clone(),
                image_url: None,
                price: product.price,
                quantity,
                seller_id: product.seller_id,
            }],
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        user(&store, "a@example.com").await;
        let err = store
            .create_user(NewUser {
                email: Email::parse("A@example.com").unwrap(),
                password_hash: "hash".to_string(),
                phone: PhoneNumber::parse("+15550100").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cart_pair_is_unique() {
        let store = MemoryStore::new();
        let buyer = user(&store, "buyer@example.com").await;
        let product = product(&store, buyer.id, 5).await;
        let line = NewCartLine::snapshot(buyer.id, &product, Quantity::new(1).unwrap());

        store.create_cart_line(line.clone()).await.unwrap();
        let err = store.create_cart_line(line).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.list_cart_lines(buyer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_order_is_all_or_nothing_on_stock() {
        let store = MemoryStore::new();
        let buyer = user(&store, "buyer@example.com").await;
        let product = product(&store, buyer.id, 2).await;
        store
            .create_cart_line(NewCartLine::snapshot(
                buyer.id,
                &product,
                Quantity::new(3).unwrap(),
            ))
            .await
            .unwrap();

        let err = store
            .place_order(order_for(buyer.id, &product, 3, 12_345_678))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InsufficientStock(id) if id == product.id));

        let stored = store.find_product_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 2);
        assert_eq!(store.list_cart_lines(buyer.id).await.unwrap().len(), 1);
        assert!(store.list_orders(buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_reserves_stock_and_clears_cart() {
        let store = MemoryStore::new();
        let buyer = user(&store, "buyer@example.com").await;
        let product = product(&store, buyer.id, 5).await;
        store
            .create_cart_line(NewCartLine::snapshot(
                buyer.id,
                &product,
                Quantity::new(2).unwrap(),
            ))
            .await
            .unwrap();

        let order = store
            .place_order(order_for(buyer.id, &product, 2, 12_345_678))
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].order_id, order.id);
        let stored = store.find_product_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 3);
        assert!(store.list_cart_lines(buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_order_reference_is_a_conflict() {
        let store = MemoryStore::new();
        let buyer = user(&store, "buyer@example.com").await;
        let product = product(&store, buyer.id, 5).await;

        store
            .place_order(order_for(buyer.id, &product, 1, 12_345_678))
            .await
            .unwrap();
        let err = store
            .place_order(order_for(buyer.id, &product, 1, 12_345_678))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        let stored = store.find_product_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 4);
    }

    #[tokio::test]
    async fn test_find_order_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let buyer = user(&store, "buyer@example.com").await;
        let other = user(&store, "other@example.com").await;
        let product = product(&store, buyer.id, 5).await;
        let order = store
            .place_order(order_for(buyer.id, &product, 1, 12_345_678))
            .await
            .unwrap();

        assert!(store.find_order(order.id, buyer.id).await.unwrap().is_some());
        assert!(store.find_order(order.id, other.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upgrade_to_seller_conflicts() {
        let store = MemoryStore::new();
        let first = user(&store, "first@example.com").await;
        let second = user(&store, "second@example.com").await;

        let seller = store
            .upgrade_to_seller(first.id, upgrade("12345678"))
            .await
            .unwrap();
        assert_eq!(seller.role, Role::Seller);

        // Second upgrade of the same user.
        let err = store
            .upgrade_to_seller(first.id, upgrade("87654321"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Account number already taken: the role must not change.
        let err = store
            .upgrade_to_seller(second.id, upgrade("12345678"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        let second = store.find_user_by_id(second.id).await.unwrap().unwrap();
        assert_eq!(second.role, Role::Buyer);
        assert!(store.find_bank_account(second.id).await.unwrap().is_none());
    }

    fn profile(first_name: &str) -> NewProfileRecord {
        NewProfileRecord {
            first_name: first_name.to_string(),
            last_name: "Lovelace".to_string(),
            address: NewAddress {
                line1: "1 Analytical Way".to_string(),
                line2: None,
                city: "London".to_string(),
                post_code: "N1 9GU".to_string(),
                country: "GB".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_create_profile_writes_names_and_address_together() {
        let store = MemoryStore::new();
        let ada = user(&store, "ada@example.com").await;

        let (user, address) = store.create_profile(ada.id, profile("Ada")).await.unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(address.user_id, ada.id);

        let err = store
            .create_profile(ada.id, profile("Augusta"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        let stored = store.find_user_by_id(ada.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let store = MemoryStore::new();
        let seller = user(&store, "seller@example.com").await;
        let product = product(&store, seller.id, 1).await;

        let err = store.delete_category(product.category_id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        store.delete_product(product.id).await.unwrap();
        store.delete_category(product.category_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_product_removes_cart_lines() {
        let store = MemoryStore::new();
        let buyer = user(&store, "buyer@example.com").await;
        let product = product(&store, buyer.id, 1).await;
        store
            .create_cart_line(NewCartLine::snapshot(
                buyer.id,
                &product,
                Quantity::new(1).unwrap(),
            ))
            .await
            .unwrap();

        store.delete_product(product.id).await.unwrap();
        assert!(store.list_cart_lines(buyer.id).await.unwrap().is_empty());
    }
}
