// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub use sea_orm_migration::prelude::*;

mod m20250401_000001_create_webhooks;
mod m20250401_000002_create_webhook_deliveries;
mod m20250401_000003_create_accounts_and_keys;
mod m20250401_000004_create_indexes;

/// 数据库迁移器
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    /// 获取所有迁移
    ///
    /// # 返回值
    ///
    /// 返回迁移列表
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250401_000001_create_webhooks::Migration),
            Box::new(m20250401_000002_create_webhook_deliveries::Migration),
            Box::new(m20250401_000003_create_accounts_and_keys::Migration),
            Box::new(m20250401_000004_create_indexes::Migration),
        ]
    }
}
