//! SQL schema for the Shelf SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS projects (
    project_id  TEXT PRIMARY KEY,
    key         TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    product_id   TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL REFERENCES projects(project_id),
    key          TEXT NOT NULL,
    sku          TEXT NOT NULL,
    name         TEXT NOT NULL,
    description  TEXT,
    price_cents  INTEGER NOT NULL,
    currency     TEXT NOT NULL,
    attributes   TEXT NOT NULL DEFAULT '{}',   -- JSON object
    created_at   TEXT NOT NULL,
    UNIQUE (project_id, sku)
);

CREATE TABLE IF NOT EXISTS customers (
    customer_id                  TEXT PRIMARY KEY,
    project_id                   TEXT NOT NULL REFERENCES projects(project_id),
    email                        TEXT NOT NULL COLLATE NOCASE,
    password_hash                TEXT NOT NULL,
    first_name                   TEXT,
    last_name                    TEXT,
    date_of_birth                TEXT,
    addresses                    TEXT NOT NULL DEFAULT '[]',   -- JSON array
    default_shipping_address_id  TEXT,
    default_billing_address_id   TEXT,
    shipping_address_ids         TEXT NOT NULL DEFAULT '[]',
    billing_address_ids          TEXT NOT NULL DEFAULT '[]',
    created_at                   TEXT NOT NULL,
    UNIQUE (project_id, email)
);

-- Exactly one subject column is set per token.
CREATE TABLE IF NOT EXISTS tokens (
    token         TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(project_id),
    customer_id   TEXT,
    anonymous_id  TEXT,
    kind          TEXT NOT NULL CHECK (kind IN ('access', 'refresh')),
    expires_at    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    CHECK ((customer_id IS NULL) <> (anonymous_id IS NULL))
);

-- Owners are weak references: no foreign key to customers.
CREATE TABLE IF NOT EXISTS carts (
    cart_id       TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(project_id),
    customer_id   TEXT,
    anonymous_id  TEXT,
    currency      TEXT NOT NULL,
    total_cents   INTEGER NOT NULL DEFAULT 0,
    state         TEXT NOT NULL DEFAULT 'active' CHECK (state IN ('active', 'deleted')),
    created_at    TEXT NOT NULL,
    CHECK (customer_id IS NULL OR anonymous_id IS NULL)
);

CREATE TABLE IF NOT EXISTS cart_lines (
    line_id           TEXT PRIMARY KEY,
    cart_id           TEXT NOT NULL REFERENCES carts(cart_id),
    product_id        TEXT NOT NULL,
    quantity          INTEGER NOT NULL CHECK (quantity > 0),
    unit_price_cents  INTEGER NOT NULL,
    total_cents       INTEGER NOT NULL,
    snapshot          TEXT NOT NULL,   -- JSON LineSnapshot, frozen at insert
    created_at        TEXT NOT NULL,
    UNIQUE (cart_id, product_id)
);

CREATE INDEX IF NOT EXISTS carts_customer_idx  ON carts(project_id, customer_id, state);
CREATE INDEX IF NOT EXISTS carts_anonymous_idx ON carts(project_id, anonymous_id, state);
CREATE INDEX IF NOT EXISTS cart_lines_cart_idx ON cart_lines(cart_id);

PRAGMA user_version = 1;
";
