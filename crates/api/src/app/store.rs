//! In-memory materials data backing the demo routes.
//!
//! Each table sits behind its own `tokio::sync::RwLock`; no lock is held
//! across another table's lock.

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::RwLock;

use haocai_core::{AppError, AppResult, business};

use crate::app::dto::{Category, CreateCategoryRequest, CreateSupplierRequest, StockLevel, Supplier};

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Default)]
pub struct MaterialsStore {
    categories: RwLock<Table<Category>>,
    suppliers: RwLock<Table<Supplier>>,
    stock: RwLock<BTreeMap<u64, StockLevel>>,
}

impl MaterialsStore {
    pub async fn list_categories(&self) -> Vec<Category> {
        self.categories.read().await.rows.values().cloned().collect()
    }

    pub async fn create_category(&self, req: CreateCategoryRequest) -> AppResult<Category> {
        let mut table = self.categories.write().await;
        let name = req.name.trim();

        if table.rows.values().any(|c| c.name == name) {
            return Err(AppError::business(business::CATEGORY_EXISTS, "分类名称已存在"));
        }
        if let Some(parent) = req.parent_id {
            if !table.rows.contains_key(&parent) {
                return Err(AppError::not_found("上级分类不存在"));
            }
        }

        let category = Category {
            id: table.allocate(),
            name: name.to_string(),
            parent_id: req.parent_id,
            created_at: Utc::now(),
        };
        table.rows.insert(category.id, category.clone());
        Ok(category)
    }

    pub async fn list_suppliers(&self) -> Vec<Supplier> {
        self.suppliers.read().await.rows.values().cloned().collect()
    }

    pub async fn get_supplier(&self, id: u64) -> AppResult<Supplier> {
        self.suppliers
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("供应商不存在"))
    }

    pub async fn create_supplier(&self, req: CreateSupplierRequest) -> AppResult<Supplier> {
        let mut table = self.suppliers.write().await;
        let name = req.name.trim();

        if table.rows.values().any(|s| s.name == name) {
            return Err(AppError::business(business::SUPPLIER_EXISTS, "供应商名称已存在"));
        }

        let supplier = Supplier {
            id: table.allocate(),
            name: name.to_string(),
            contact_person: req.contact_person,
            phone: req.phone,
            email: req.email,
            created_at: Utc::now(),
        };
        table.rows.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    pub async fn update_supplier(&self, id: u64, req: CreateSupplierRequest) -> AppResult<Supplier> {
        let mut table = self.suppliers.write().await;
        let name = req.name.trim();

        if table.rows.values().any(|s| s.id != id && s.name == name) {
            return Err(AppError::business(business::SUPPLIER_EXISTS, "供应商名称已存在"));
        }
        let supplier = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("供应商不存在"))?;

        supplier.name = name.to_string();
        supplier.contact_person = req.contact_person;
        supplier.phone = req.phone;
        supplier.email = req.email;
        Ok(supplier.clone())
    }

    pub async fn delete_supplier(&self, id: u64) -> AppResult<()> {
        self.suppliers
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("供应商不存在"))
    }

    pub async fn stock(&self, material_id: u64) -> StockLevel {
        self.stock
            .read()
            .await
            .get(&material_id)
            .cloned()
            .unwrap_or(StockLevel {
                material_id,
                quantity: 0,
                updated_at: None,
            })
    }

    /// Apply `delta`; the resulting quantity may not go below zero.
    pub async fn adjust_stock(&self, material_id: u64, delta: i64) -> AppResult<StockLevel> {
        let mut stock = self.stock.write().await;
        let current = stock.get(&material_id).map_or(0, |s| s.quantity);

        let quantity = current
            .checked_add(delta)
            .ok_or_else(|| AppError::business(business::OPERATION_FAILED, "库存数量超出范围"))?;
        if quantity < 0 {
            return Err(AppError::business(business::STOCK_INSUFFICIENT, "库存不足")
                .with_detail(format!("material {material_id}: have {current}, delta {delta}")));
        }

        let level = StockLevel {
            material_id,
            quantity,
            updated_at: Some(Utc::now()),
        };
        stock.insert(material_id, level.clone());
        Ok(level)
    }
}
