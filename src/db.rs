//! SQLite persistence for the ledger.
//!
//! rusqlite in WAL mode with sequential migrations recorded in
//! `schema_version`. Listing filters run in SQL; the row mappers turn TEXT
//! columns back into dates and enum values, and amounts are stored as
//! INTEGER paise so the books never touch floating point.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AttendanceRecord, AttendanceStatus, CreditRecord, CreditState, ExpenseEntry, ExpensePatch,
    IncomeEntry, IncomePatch, NewAttendance, NewCredit, NewExpense, NewIncome, NewPayment,
    NewStaff, SalaryPayment, Staff, StaffPatch,
};
use crate::money::Money;
use crate::snapshot::Snapshot;
use crate::store::{AttendanceFilter, CreditFilter, EntryFilter, LedgerStore, PaymentFilter};

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// File-backed [`LedgerStore`]. One connection behind a mutex is plenty for
/// a single-terminal ledger.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Opens (or creates) the database file, applies pragmas, and runs any
    /// pending migrations. The parent directory is created if needed.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<SqliteLedger> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LedgerError::storage(format!("create data dir: {e}")))?;
        }
        info!("Opening ledger database at {}", path.display());

        let conn = open_and_configure(path)?;
        run_migrations(&conn)?;

        info!("Ledger database ready (schema v{CURRENT_SCHEMA_VERSION})");

        Ok(SqliteLedger {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store with the full schema, for tests and dry runs.
    pub fn open_in_memory() -> LedgerResult<SqliteLedger> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )?;
        run_migrations(&conn)?;
        Ok(SqliteLedger {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::storage("database lock poisoned"))
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Reads a single setting, e.g. the access-gate hash.
    pub fn get_setting(&self, key: &str) -> LedgerResult<Option<String>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT setting_value FROM settings WHERE setting_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Inserts or updates a setting.
    pub fn set_setting(&self, key: &str, value: &str) -> LedgerResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (setting_key, setting_value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(setting_key) DO UPDATE SET
                setting_value = excluded.setting_value,
                updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Snapshot import
    // -----------------------------------------------------------------------

    /// Replaces every collection with the snapshot's contents, in one
    /// transaction. Ids and soft-deleted rows come through intact; settings
    /// are left alone.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> LedgerResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;

        let result = (|| -> LedgerResult<()> {
            // Children before staff, for the foreign keys.
            conn.execute_batch(
                "DELETE FROM attendance;
                 DELETE FROM salary_payments;
                 DELETE FROM staff;
                 DELETE FROM income;
                 DELETE FROM expenses;
                 DELETE FROM credits;",
            )?;

            for staff in &snapshot.staff {
                conn.execute(
                    "INSERT INTO staff (id, name, phone, role, monthly_salary_paise, is_deleted)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        staff.id,
                        staff.name,
                        staff.phone,
                        staff.role,
                        staff.monthly_salary.paise(),
                        staff.is_deleted,
                    ],
                )?;
            }
            for entry in &snapshot.income {
                conn.execute(
                    "INSERT INTO income (id, entry_date, source, description, amount_paise, is_deleted)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        entry.id,
                        entry.date.to_string(),
                        entry.source.as_str(),
                        entry.description.as_deref(),
                        entry.amount.paise(),
                        entry.is_deleted,
                    ],
                )?;
            }
            for entry in &snapshot.expenses {
                conn.execute(
                    "INSERT INTO expenses (id, entry_date, category, description, amount_paise, is_deleted)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        entry.id,
                        entry.date.to_string(),
                        entry.category.as_str(),
                        entry.description.as_deref(),
                        entry.amount.paise(),
                        entry.is_deleted,
                    ],
                )?;
            }
            for record in &snapshot.attendance {
                conn.execute(
                    "INSERT INTO attendance (id, staff_id, attendance_date, status)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        record.id,
                        record.staff_id,
                        record.date.to_string(),
                        record.status.as_str(),
                    ],
                )?;
            }
            for payment in &snapshot.salary_payments {
                conn.execute(
                    "INSERT INTO salary_payments (id, staff_id, payment_date, amount_paise, kind)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        payment.id,
                        payment.staff_id,
                        payment.date.to_string(),
                        payment.amount.paise(),
                        payment.kind.as_str(),
                    ],
                )?;
            }
            for credit in &snapshot.credits {
                conn.execute(
                    "INSERT INTO credits (id, customer_name, phone, amount_paise, reason, due_date, status, credit_date, is_deleted)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        credit.id,
                        credit.customer_name,
                        credit.phone,
                        credit.amount.paise(),
                        credit.reason,
                        credit.due_date.map(|d| d.to_string()),
                        credit.status.as_str(),
                        credit.date.to_string(),
                        credit.is_deleted,
                    ],
                )?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT")?;
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(e);
            }
        }

        info!(
            income = snapshot.income.len(),
            expenses = snapshot.expenses.len(),
            staff = snapshot.staff.len(),
            attendance = snapshot.attendance.len(),
            payments = snapshot.salary_payments.len(),
            credits = snapshot.credits.len(),
            "Snapshot imported"
        );
        Ok(())
    }
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> LedgerResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(conn)
}

// ---------------------------------------------------------------------------
// Migrations
// ---------------------------------------------------------------------------

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Ledger schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating ledger schema from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Migration v1: the six ledger collections plus the settings store.
fn migrate_v1(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(
        "
        -- settings (key/value store for the gate hash and behavior flags)
        CREATE TABLE IF NOT EXISTS settings (
            setting_key TEXT PRIMARY KEY,
            setting_value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- income
        CREATE TABLE IF NOT EXISTS income (
            id TEXT PRIMARY KEY,
            entry_date TEXT NOT NULL,
            source TEXT NOT NULL
                CHECK (source IN ('Restaurant', 'Bulk Orders', 'Zomato', 'Other')),
            description TEXT,
            amount_paise INTEGER NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );

        -- expenses
        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            entry_date TEXT NOT NULL,
            category TEXT NOT NULL
                CHECK (category IN ('Chicken', 'Milk & Curd', 'Groceries', 'Vegetables',
                                    'Water', 'Fish', 'Spices', 'Electricity', 'Rent', 'Other')),
            description TEXT,
            amount_paise INTEGER NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );

        -- staff (archived instead of removed, so history keeps resolving)
        CREATE TABLE IF NOT EXISTS staff (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            phone TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT '',
            monthly_salary_paise INTEGER NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );

        -- attendance (one row per staff member and day)
        CREATE TABLE IF NOT EXISTS attendance (
            id TEXT PRIMARY KEY,
            staff_id TEXT NOT NULL,
            attendance_date TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('Present', 'Absent')),
            UNIQUE (staff_id, attendance_date),
            FOREIGN KEY (staff_id) REFERENCES staff(id)
        );

        -- salary_payments (append-only)
        CREATE TABLE IF NOT EXISTS salary_payments (
            id TEXT PRIMARY KEY,
            staff_id TEXT NOT NULL,
            payment_date TEXT NOT NULL,
            amount_paise INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('Salary', 'Advance')),
            FOREIGN KEY (staff_id) REFERENCES staff(id)
        );

        -- credits (customer tabs)
        CREATE TABLE IF NOT EXISTS credits (
            id TEXT PRIMARY KEY,
            customer_name TEXT NOT NULL,
            phone TEXT NOT NULL DEFAULT '',
            amount_paise INTEGER NOT NULL,
            reason TEXT NOT NULL DEFAULT '',
            credit_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Pending' CHECK (status IN ('Pending', 'Paid')),
            is_deleted INTEGER NOT NULL DEFAULT 0
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_income_date ON income(entry_date);
        CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(entry_date);
        CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(attendance_date);
        CREATE INDEX IF NOT EXISTS idx_salary_payments_staff ON salary_payments(staff_id, payment_date);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        LedgerError::from(e)
    })?;

    info!("Applied migration v1 (ledger tables)");
    Ok(())
}

/// Migration v2: credit due dates, which arrived with the reminder screen.
/// Older rows stay NULL.
fn migrate_v2(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(
        "
        ALTER TABLE credits ADD COLUMN due_date TEXT;

        CREATE INDEX IF NOT EXISTS idx_credits_status ON credits(status);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        LedgerError::from(e)
    })?;

    info!("Applied migration v2 (credit due dates)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Parses a TEXT column through `FromStr`, surfacing bad stored values as
/// conversion failures rather than panics.
fn parsed_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_text_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn income_from_row(row: &Row<'_>) -> rusqlite::Result<IncomeEntry> {
    Ok(IncomeEntry {
        id: row.get(0)?,
        date: parsed_text(row, 1)?,
        source: parsed_text(row, 2)?,
        description: row.get(3)?,
        amount: Money::from_paise(row.get(4)?),
        is_deleted: row.get(5)?,
    })
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<ExpenseEntry> {
    Ok(ExpenseEntry {
        id: row.get(0)?,
        date: parsed_text(row, 1)?,
        category: parsed_text(row, 2)?,
        description: row.get(3)?,
        amount: Money::from_paise(row.get(4)?),
        is_deleted: row.get(5)?,
    })
}

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        role: row.get(3)?,
        monthly_salary: Money::from_paise(row.get(4)?),
        is_deleted: row.get(5)?,
    })
}

fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        date: parsed_text(row, 2)?,
        status: parsed_text(row, 3)?,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<SalaryPayment> {
    Ok(SalaryPayment {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        date: parsed_text(row, 2)?,
        amount: Money::from_paise(row.get(3)?),
        kind: parsed_text(row, 4)?,
    })
}

fn credit_from_row(row: &Row<'_>) -> rusqlite::Result<CreditRecord> {
    Ok(CreditRecord {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        phone: row.get(2)?,
        amount: Money::from_paise(row.get(3)?),
        reason: row.get(4)?,
        due_date: parsed_text_opt(row, 5)?,
        status: parsed_text(row, 6)?,
        date: parsed_text(row, 7)?,
        is_deleted: row.get(8)?,
    })
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

fn ensure_active_staff(conn: &Connection, staff_id: &str) -> LedgerResult<()> {
    let active: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM staff WHERE id = ?1 AND is_deleted = 0)",
        params![staff_id],
        |row| row.get(0),
    )?;
    if active {
        Ok(())
    } else {
        Err(LedgerError::not_found("staff", staff_id))
    }
}

fn get_income(conn: &Connection, id: &str) -> LedgerResult<IncomeEntry> {
    conn.query_row(
        "SELECT id, entry_date, source, description, amount_paise, is_deleted
           FROM income WHERE id = ?1 AND is_deleted = 0",
        params![id],
        income_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("income entry", id))
}

fn get_expense(conn: &Connection, id: &str) -> LedgerResult<ExpenseEntry> {
    conn.query_row(
        "SELECT id, entry_date, category, description, amount_paise, is_deleted
           FROM expenses WHERE id = ?1 AND is_deleted = 0",
        params![id],
        expense_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("expense entry", id))
}

fn get_credit_row(conn: &Connection, id: &str) -> LedgerResult<CreditRecord> {
    conn.query_row(
        "SELECT id, customer_name, phone, amount_paise, reason, due_date, status, credit_date, is_deleted
           FROM credits WHERE id = ?1 AND is_deleted = 0",
        params![id],
        credit_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("credit record", id))
}

impl LedgerStore for SqliteLedger {
    fn insert_income(&self, draft: NewIncome) -> LedgerResult<IncomeEntry> {
        draft.validate()?;
        let conn = self.lock()?;
        let entry = IncomeEntry {
            id: Uuid::new_v4().to_string(),
            date: draft.date,
            source: draft.source,
            description: draft.description,
            amount: draft.amount,
            is_deleted: false,
        };
        conn.execute(
            "INSERT INTO income (id, entry_date, source, description, amount_paise, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                entry.id,
                entry.date.to_string(),
                entry.source.as_str(),
                entry.description.as_deref(),
                entry.amount.paise(),
            ],
        )?;
        Ok(entry)
    }

    fn update_income(&self, id: &str, patch: IncomePatch) -> LedgerResult<IncomeEntry> {
        patch.validate()?;
        let conn = self.lock()?;
        let mut entry = get_income(&conn, id)?;
        if let Some(date) = patch.date {
            entry.date = date;
        }
        if let Some(source) = patch.source {
            entry.source = source;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(amount) = patch.amount {
            entry.amount = amount;
        }
        conn.execute(
            "UPDATE income
                SET entry_date = ?2, source = ?3, description = ?4, amount_paise = ?5
              WHERE id = ?1",
            params![
                entry.id,
                entry.date.to_string(),
                entry.source.as_str(),
                entry.description.as_deref(),
                entry.amount.paise(),
            ],
        )?;
        Ok(entry)
    }

    fn delete_income(&self, id: &str) -> LedgerResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE income SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
            params![id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("income entry", id));
        }
        Ok(())
    }

    fn list_income(&self, filter: &EntryFilter) -> LedgerResult<Vec<IncomeEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, entry_date, source, description, amount_paise, is_deleted
               FROM income
              WHERE (?1 IS NULL OR entry_date >= ?1)
                AND (?2 IS NULL OR entry_date <= ?2)
                AND (?3 OR is_deleted = 0)
              ORDER BY entry_date, id",
        )?;
        let rows = stmt.query_map(
            params![
                filter.from.map(|d| d.to_string()),
                filter.to.map(|d| d.to_string()),
                filter.include_deleted,
            ],
            income_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_expense(&self, draft: NewExpense) -> LedgerResult<ExpenseEntry> {
        draft.validate()?;
        let conn = self.lock()?;
        let entry = ExpenseEntry {
            id: Uuid::new_v4().to_string(),
            date: draft.date,
            category: draft.category,
            description: draft.description,
            amount: draft.amount,
            is_deleted: false,
        };
        conn.execute(
            "INSERT INTO expenses (id, entry_date, category, description, amount_paise, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                entry.id,
                entry.date.to_string(),
                entry.category.as_str(),
                entry.description.as_deref(),
                entry.amount.paise(),
            ],
        )?;
        Ok(entry)
    }

    fn update_expense(&self, id: &str, patch: ExpensePatch) -> LedgerResult<ExpenseEntry> {
        patch.validate()?;
        let conn = self.lock()?;
        let mut entry = get_expense(&conn, id)?;
        if let Some(date) = patch.date {
            entry.date = date;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(amount) = patch.amount {
            entry.amount = amount;
        }
        conn.execute(
            "UPDATE expenses
                SET entry_date = ?2, category = ?3, description = ?4, amount_paise = ?5
              WHERE id = ?1",
            params![
                entry.id,
                entry.date.to_string(),
                entry.category.as_str(),
                entry.description.as_deref(),
                entry.amount.paise(),
            ],
        )?;
        Ok(entry)
    }

    fn delete_expense(&self, id: &str) -> LedgerResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE expenses SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
            params![id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("expense entry", id));
        }
        Ok(())
    }

    fn list_expenses(&self, filter: &EntryFilter) -> LedgerResult<Vec<ExpenseEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, entry_date, category, description, amount_paise, is_deleted
               FROM expenses
              WHERE (?1 IS NULL OR entry_date >= ?1)
                AND (?2 IS NULL OR entry_date <= ?2)
                AND (?3 OR is_deleted = 0)
              ORDER BY entry_date, id",
        )?;
        let rows = stmt.query_map(
            params![
                filter.from.map(|d| d.to_string()),
                filter.to.map(|d| d.to_string()),
                filter.include_deleted,
            ],
            expense_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_staff(&self, draft: NewStaff) -> LedgerResult<Staff> {
        draft.validate()?;
        let conn = self.lock()?;
        let staff = Staff {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            phone: draft.phone,
            role: draft.role,
            monthly_salary: draft.monthly_salary,
            is_deleted: false,
        };
        conn.execute(
            "INSERT INTO staff (id, name, phone, role, monthly_salary_paise, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                staff.id,
                staff.name,
                staff.phone,
                staff.role,
                staff.monthly_salary.paise(),
            ],
        )?;
        Ok(staff)
    }

    fn update_staff(&self, id: &str, patch: StaffPatch) -> LedgerResult<Staff> {
        patch.validate()?;
        let conn = self.lock()?;
        let mut staff = conn
            .query_row(
                "SELECT id, name, phone, role, monthly_salary_paise, is_deleted
                   FROM staff WHERE id = ?1 AND is_deleted = 0",
                params![id],
                staff_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("staff", id))?;
        if let Some(name) = patch.name {
            staff.name = name;
        }
        if let Some(phone) = patch.phone {
            staff.phone = phone;
        }
        if let Some(role) = patch.role {
            staff.role = role;
        }
        if let Some(salary) = patch.monthly_salary {
            staff.monthly_salary = salary;
        }
        conn.execute(
            "UPDATE staff SET name = ?2, phone = ?3, role = ?4, monthly_salary_paise = ?5
              WHERE id = ?1",
            params![
                staff.id,
                staff.name,
                staff.phone,
                staff.role,
                staff.monthly_salary.paise(),
            ],
        )?;
        Ok(staff)
    }

    fn delete_staff(&self, id: &str) -> LedgerResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE staff SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
            params![id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("staff", id));
        }
        Ok(())
    }

    fn list_staff(&self, include_archived: bool) -> LedgerResult<Vec<Staff>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, phone, role, monthly_salary_paise, is_deleted
               FROM staff
              WHERE (?1 OR is_deleted = 0)
              ORDER BY name, id",
        )?;
        let rows = stmt.query_map(params![include_archived], staff_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_staff(&self, id: &str) -> LedgerResult<Staff> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, phone, role, monthly_salary_paise, is_deleted
               FROM staff WHERE id = ?1",
            params![id],
            staff_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("staff", id))
    }

    fn insert_attendance(&self, draft: NewAttendance) -> LedgerResult<AttendanceRecord> {
        let conn = self.lock()?;
        ensure_active_staff(&conn, &draft.staff_id)?;
        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            staff_id: draft.staff_id,
            date: draft.date,
            status: draft.status,
        };
        conn.execute(
            "INSERT INTO attendance (id, staff_id, attendance_date, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.staff_id,
                record.date.to_string(),
                record.status.as_str(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                LedgerError::conflict(format!(
                    "attendance already recorded for staff {} on {}",
                    record.staff_id, record.date
                ))
            }
            other => LedgerError::from(other),
        })?;
        Ok(record)
    }

    fn set_attendance_status(
        &self,
        id: &str,
        status: AttendanceStatus,
    ) -> LedgerResult<AttendanceRecord> {
        let conn = self.lock()?;
        let mut record = conn
            .query_row(
                "SELECT id, staff_id, attendance_date, status FROM attendance WHERE id = ?1",
                params![id],
                attendance_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("attendance record", id))?;
        conn.execute(
            "UPDATE attendance SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        record.status = status;
        Ok(record)
    }

    fn list_attendance(&self, filter: &AttendanceFilter) -> LedgerResult<Vec<AttendanceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, staff_id, attendance_date, status
               FROM attendance
              WHERE (?1 IS NULL OR staff_id = ?1)
                AND (?2 IS NULL OR attendance_date >= ?2)
                AND (?3 IS NULL OR attendance_date <= ?3)
              ORDER BY attendance_date, staff_id",
        )?;
        let rows = stmt.query_map(
            params![
                filter.staff_id.as_deref(),
                filter.from.map(|d| d.to_string()),
                filter.to.map(|d| d.to_string()),
            ],
            attendance_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_payment(&self, draft: NewPayment) -> LedgerResult<SalaryPayment> {
        draft.validate()?;
        let conn = self.lock()?;
        ensure_active_staff(&conn, &draft.staff_id)?;
        let payment = SalaryPayment {
            id: Uuid::new_v4().to_string(),
            staff_id: draft.staff_id,
            date: draft.date,
            amount: draft.amount,
            kind: draft.kind,
        };
        conn.execute(
            "INSERT INTO salary_payments (id, staff_id, payment_date, amount_paise, kind)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                payment.id,
                payment.staff_id,
                payment.date.to_string(),
                payment.amount.paise(),
                payment.kind.as_str(),
            ],
        )?;
        Ok(payment)
    }

    fn list_payments(&self, filter: &PaymentFilter) -> LedgerResult<Vec<SalaryPayment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, staff_id, payment_date, amount_paise, kind
               FROM salary_payments
              WHERE (?1 IS NULL OR staff_id = ?1)
                AND (?2 IS NULL OR payment_date >= ?2)
                AND (?3 IS NULL OR payment_date <= ?3)
              ORDER BY payment_date, id",
        )?;
        let rows = stmt.query_map(
            params![
                filter.staff_id.as_deref(),
                filter.from.map(|d| d.to_string()),
                filter.to.map(|d| d.to_string()),
            ],
            payment_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_credit(&self, draft: NewCredit) -> LedgerResult<CreditRecord> {
        draft.validate()?;
        let conn = self.lock()?;
        let credit = CreditRecord {
            id: Uuid::new_v4().to_string(),
            customer_name: draft.customer_name,
            phone: draft.phone,
            amount: draft.amount,
            reason: draft.reason,
            due_date: draft.due_date,
            status: CreditState::Pending,
            date: draft.date,
            is_deleted: false,
        };
        conn.execute(
            "INSERT INTO credits (id, customer_name, phone, amount_paise, reason, due_date, status, credit_date, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
            params![
                credit.id,
                credit.customer_name,
                credit.phone,
                credit.amount.paise(),
                credit.reason,
                credit.due_date.map(|d| d.to_string()),
                credit.status.as_str(),
                credit.date.to_string(),
            ],
        )?;
        Ok(credit)
    }

    fn get_credit(&self, id: &str) -> LedgerResult<CreditRecord> {
        let conn = self.lock()?;
        get_credit_row(&conn, id)
    }

    fn mark_credit_paid(&self, id: &str) -> LedgerResult<CreditRecord> {
        let conn = self.lock()?;
        let mut credit = get_credit_row(&conn, id)?;
        conn.execute(
            "UPDATE credits SET status = ?2 WHERE id = ?1",
            params![id, CreditState::Paid.as_str()],
        )?;
        credit.status = CreditState::Paid;
        Ok(credit)
    }

    fn delete_credit(&self, id: &str) -> LedgerResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE credits SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
            params![id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("credit record", id));
        }
        Ok(())
    }

    fn list_credits(&self, filter: &CreditFilter) -> LedgerResult<Vec<CreditRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, customer_name, phone, amount_paise, reason, due_date, status, credit_date, is_deleted
               FROM credits
              WHERE (?1 IS NULL OR status = ?1)
                AND (?2 OR is_deleted = 0)
              ORDER BY credit_date, id",
        )?;
        let rows = stmt.query_map(
            params![filter.status.map(|s| s.as_str()), filter.include_deleted],
            credit_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Ledger;
    use crate::models::{ExpenseCategory, IncomeSource, PayoutKind};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn test_store() -> SqliteLedger {
        SqliteLedger::open_in_memory().expect("open in-memory ledger")
    }

    fn income(date: &str, amount: i64) -> NewIncome {
        NewIncome {
            date: d(date),
            source: IncomeSource::Restaurant,
            description: None,
            amount: Money::from_rupees(amount),
        }
    }

    fn add_staff(store: &SqliteLedger, name: &str) -> Staff {
        store
            .insert_staff(NewStaff {
                name: name.into(),
                phone: "9876500000".into(),
                role: "Cook".into(),
                monthly_salary: Money::from_rupees(18_000),
            })
            .unwrap()
    }

    /// Helper: list table names in the database.
    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare table list");
        stmt.query_map([], |row| row.get(0))
            .expect("query tables")
            .filter_map(|r| r.ok())
            .collect()
    }

    // ------------------------------------------------------------------
    // Migration tests
    // ------------------------------------------------------------------

    #[test]
    fn test_migrations_create_ledger_tables() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .expect("pragma setup");
        run_migrations(&conn).expect("run_migrations should succeed");

        let tables = table_names(&conn);
        for expected in [
            "settings",
            "income",
            "expenses",
            "staff",
            "attendance",
            "salary_payments",
            "credits",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }

        // v2: due_date column exists (the query fails otherwise, even empty).
        let _due_date_check: Result<Option<String>, _> =
            conn.query_row("SELECT due_date FROM credits LIMIT 0", [], |row| row.get(0));

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .expect("read schema version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        run_migrations(&conn).expect("first run");
        run_migrations(&conn).expect("second run should succeed");

        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .expect("count versions");
        assert_eq!(rows, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_file_db_uses_wal_and_survives_reopen() {
        let dir = std::env::temp_dir().join("hotelflow_ledger_wal_test");
        let _ = std::fs::remove_dir_all(&dir);
        let db_path = dir.join("books.db");

        let store = SqliteLedger::open(&db_path).expect("open file db");
        {
            let conn = store.conn.lock().unwrap();
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .expect("read journal_mode");
            assert_eq!(mode.to_lowercase(), "wal", "journal_mode should be WAL");
        }
        store.insert_income(income("2024-05-01", 1_000)).unwrap();
        drop(store);

        let reopened = SqliteLedger::open(&db_path).expect("reopen file db");
        let entries = reopened.list_income(&EntryFilter::all()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, Money::from_rupees(1_000));

        drop(reopened);
        let _ = std::fs::remove_dir_all(&dir);
    }

    // ------------------------------------------------------------------
    // Store behavior
    // ------------------------------------------------------------------

    #[test]
    fn test_income_crud_and_sql_filters() {
        let store = test_store();
        let a = store.insert_income(income("2024-05-01", 1_000)).unwrap();
        store.insert_income(income("2024-05-15", 250)).unwrap();
        store.insert_income(income("2024-06-01", 99)).unwrap();

        assert_eq!(store.list_income(&EntryFilter::all()).unwrap().len(), 3);
        assert_eq!(
            store
                .list_income(&EntryFilter::on(d("2024-05-01")))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store
                .list_income(&EntryFilter::month("2024-05".parse().unwrap()))
                .unwrap()
                .len(),
            2
        );

        let updated = store
            .update_income(
                &a.id,
                IncomePatch {
                    amount: Some(Money::from_rupees(1_100)),
                    description: Some(Some("corrected".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.amount, Money::from_rupees(1_100));
        assert_eq!(updated.description.as_deref(), Some("corrected"));

        // The patched row survives the round trip through the table.
        let read_back = store.list_income(&EntryFilter::on(d("2024-05-01"))).unwrap();
        assert_eq!(read_back[0], updated);

        store.delete_income(&a.id).unwrap();
        assert_eq!(store.list_income(&EntryFilter::all()).unwrap().len(), 2);
        let with_deleted = store
            .list_income(&EntryFilter {
                include_deleted: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(with_deleted.len(), 3);
        assert!(matches!(
            store.delete_income(&a.id),
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            store.update_income(&a.id, IncomePatch::default()),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_expense_category_check_constraint_matches_enum() {
        let store = test_store();
        for category in ExpenseCategory::ALL {
            store
                .insert_expense(NewExpense {
                    date: d("2024-05-01"),
                    category,
                    description: None,
                    amount: Money::from_rupees(10),
                })
                .unwrap();
        }
        let listed = store.list_expenses(&EntryFilter::all()).unwrap();
        assert_eq!(listed.len(), ExpenseCategory::ALL.len());
    }

    #[test]
    fn test_attendance_unique_maps_to_conflict() {
        let store = test_store();
        let staff = add_staff(&store, "Ravi");

        let record = store
            .insert_attendance(NewAttendance {
                staff_id: staff.id.clone(),
                date: d("2024-05-01"),
                status: AttendanceStatus::Present,
            })
            .unwrap();

        let duplicate = store.insert_attendance(NewAttendance {
            staff_id: staff.id.clone(),
            date: d("2024-05-01"),
            status: AttendanceStatus::Absent,
        });
        assert!(matches!(duplicate, Err(LedgerError::Conflict(_))));

        let ghost = store.insert_attendance(NewAttendance {
            staff_id: "missing".into(),
            date: d("2024-05-01"),
            status: AttendanceStatus::Present,
        });
        assert!(matches!(ghost, Err(LedgerError::NotFound { .. })));

        let flipped = store
            .set_attendance_status(&record.id, AttendanceStatus::Absent)
            .unwrap();
        assert_eq!(flipped.status, AttendanceStatus::Absent);
        assert_eq!(flipped.id, record.id);
    }

    #[test]
    fn test_staff_archive_keeps_history() {
        let store = test_store();
        let staff = add_staff(&store, "Ravi");
        store
            .insert_payment(NewPayment {
                staff_id: staff.id.clone(),
                date: d("2024-05-03"),
                amount: Money::from_rupees(5_000),
                kind: PayoutKind::Advance,
            })
            .unwrap();

        store.delete_staff(&staff.id).unwrap();

        assert_eq!(store.list_payments(&PaymentFilter::all()).unwrap().len(), 1);
        assert!(store.get_staff(&staff.id).unwrap().is_deleted);
        assert!(store.list_staff(false).unwrap().is_empty());
        assert_eq!(store.list_staff(true).unwrap().len(), 1);

        let rejected = store.insert_payment(NewPayment {
            staff_id: staff.id.clone(),
            date: d("2024-05-04"),
            amount: Money::from_rupees(500),
            kind: PayoutKind::Salary,
        });
        assert!(matches!(rejected, Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn test_credit_lifecycle_and_due_date_round_trip() {
        let store = test_store();
        let credit = store
            .insert_credit(NewCredit {
                customer_name: "Meena".into(),
                phone: "9400000000".into(),
                amount: Money::from_rupees(750),
                reason: "Dinner party".into(),
                due_date: Some(d("2024-05-01")),
                date: d("2024-04-28"),
            })
            .unwrap();
        assert_eq!(credit.status, CreditState::Pending);

        let fetched = store.get_credit(&credit.id).unwrap();
        assert_eq!(fetched.due_date, Some(d("2024-05-01")));
        assert_eq!(fetched.date, d("2024-04-28"));

        let paid = store.mark_credit_paid(&credit.id).unwrap();
        assert_eq!(paid.status, CreditState::Paid);
        assert_eq!(
            store
                .list_credits(&CreditFilter::with_status(CreditState::Paid))
                .unwrap()
                .len(),
            1
        );
        assert!(store
            .list_credits(&CreditFilter::with_status(CreditState::Pending))
            .unwrap()
            .is_empty());

        store.delete_credit(&credit.id).unwrap();
        assert!(matches!(
            store.get_credit(&credit.id),
            Err(LedgerError::NotFound { .. })
        ));
        assert!(store.list_credits(&CreditFilter::all()).unwrap().is_empty());
        assert_eq!(
            store
                .list_credits(&CreditFilter {
                    include_deleted: true,
                    ..Default::default()
                })
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_settings_round_trip() {
        let store = test_store();
        assert_eq!(store.get_setting("gate_secret_hash").unwrap(), None);
        store.set_setting("gate_secret_hash", "$2b$04$abc").unwrap();
        assert_eq!(
            store.get_setting("gate_secret_hash").unwrap().as_deref(),
            Some("$2b$04$abc")
        );
        store.set_setting("gate_secret_hash", "$2b$04$def").unwrap();
        assert_eq!(
            store.get_setting("gate_secret_hash").unwrap().as_deref(),
            Some("$2b$04$def")
        );
    }

    #[test]
    fn test_import_snapshot_replaces_existing_rows() {
        let store = test_store();
        store.insert_income(income("2024-01-01", 9_999)).unwrap();

        let snapshot = Snapshot {
            income: vec![IncomeEntry {
                id: "i1".into(),
                date: d("2024-05-01"),
                source: IncomeSource::BulkOrders,
                description: Some("Wedding order".into()),
                amount: Money::from_rupees(12_000),
                is_deleted: false,
            }],
            expenses: vec![ExpenseEntry {
                id: "e1".into(),
                date: d("2024-05-01"),
                category: ExpenseCategory::Chicken,
                description: None,
                amount: Money::from_rupees(2_400),
                is_deleted: true,
            }],
            staff: vec![Staff {
                id: "s1".into(),
                name: "Ravi".into(),
                phone: "9876500000".into(),
                role: "Cook".into(),
                monthly_salary: Money::from_rupees(18_000),
                is_deleted: false,
            }],
            attendance: vec![AttendanceRecord {
                id: "a1".into(),
                staff_id: "s1".into(),
                date: d("2024-05-01"),
                status: AttendanceStatus::Present,
            }],
            salary_payments: vec![SalaryPayment {
                id: "p1".into(),
                staff_id: "s1".into(),
                date: d("2024-05-03"),
                amount: Money::from_rupees(5_000),
                kind: PayoutKind::Advance,
            }],
            credits: vec![CreditRecord {
                id: "c1".into(),
                customer_name: "Meena".into(),
                phone: String::new(),
                amount: Money::from_rupees(750),
                reason: "tab".into(),
                due_date: Some(d("2024-05-20")),
                status: CreditState::Pending,
                date: d("2024-04-28"),
                is_deleted: false,
            }],
        };
        store.import_snapshot(&snapshot).unwrap();

        let entries = store.list_income(&EntryFilter::all()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "i1");

        // The soft-deleted expense is retained but hidden.
        assert!(store.list_expenses(&EntryFilter::all()).unwrap().is_empty());
        assert_eq!(
            store
                .list_expenses(&EntryFilter {
                    include_deleted: true,
                    ..Default::default()
                })
                .unwrap()
                .len(),
            1
        );

        assert_eq!(store.get_staff("s1").unwrap().name, "Ravi");
        assert_eq!(
            store.list_attendance(&AttendanceFilter::all()).unwrap().len(),
            1
        );
        assert_eq!(store.list_payments(&PaymentFilter::all()).unwrap().len(), 1);
        assert_eq!(
            store.get_credit("c1").unwrap().due_date,
            Some(d("2024-05-20"))
        );

        // Collecting gives back exactly what was imported.
        let collected = Snapshot::collect(&store).unwrap();
        assert_eq!(collected.income, snapshot.income);
        assert_eq!(collected.expenses, snapshot.expenses);
        assert_eq!(collected.credits, snapshot.credits);

        // Importing an empty snapshot clears the books.
        store.import_snapshot(&Snapshot::default()).unwrap();
        assert!(store.list_income(&EntryFilter::all()).unwrap().is_empty());
        assert!(store.list_staff(true).unwrap().is_empty());
    }

    #[test]
    fn test_engine_saga_runs_on_sqlite() {
        let ledger = Ledger::new(test_store());
        let staff = add_staff(ledger.store(), "Ravi");

        let first = ledger.toggle_attendance(&staff.id, d("2024-05-01")).unwrap();
        assert_eq!(first.status, AttendanceStatus::Present);
        let second = ledger.toggle_attendance(&staff.id, d("2024-05-01")).unwrap();
        assert_eq!(second.status, AttendanceStatus::Absent);
        assert_eq!(second.id, first.id);

        let receipt = ledger
            .record_payout(
                &staff.id,
                d("2024-05-03"),
                Money::from_rupees(500),
                PayoutKind::Advance,
            )
            .unwrap();
        assert_eq!(receipt.mirrored_expense.category, ExpenseCategory::Other);

        let audit = ledger.reconcile_payouts().unwrap();
        assert_eq!(audit.checked, 1);
        assert!(audit.orphans.is_empty());
    }
}
