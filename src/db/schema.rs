pub const SQLITE_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS proofs (
    secret TEXT PRIMARY KEY NOT NULL,
    id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    c TEXT NOT NULL,
    reserved BOOLEAN NOT NULL DEFAULT 0 CHECK (reserved IN (0,1)),
    send_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS proofs_used (
    secret TEXT UNIQUE NOT NULL,
    id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    c TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS promises (
    b_b TEXT UNIQUE NOT NULL,
    c_b TEXT NOT NULL,
    amount INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS p2sh_scripts (
    address TEXT UNIQUE NOT NULL,
    script TEXT NOT NULL,
    signature TEXT NOT NULL
);
";

/// Only created if the Lightning subsystem is enabled
pub const SQLITE_INVOICE_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS invoices (
    hash TEXT PRIMARY KEY NOT NULL,
    amount INTEGER NOT NULL,
    pr TEXT NOT NULL,
    paid BOOLEAN NOT NULL DEFAULT 0 CHECK (paid IN (0,1)),
    issued BOOLEAN NOT NULL DEFAULT 0 CHECK (issued IN (0,1)),
    time_created INTEGER NOT NULL,
    time_paid INTEGER
);
";

pub const POSTGRES_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS proofs (
    secret TEXT PRIMARY KEY,
    id TEXT NOT NULL,
    amount BIGINT NOT NULL,
    c TEXT NOT NULL,
    reserved BOOLEAN NOT NULL DEFAULT FALSE,
    send_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS proofs_used (
    secret TEXT UNIQUE NOT NULL,
    id TEXT NOT NULL,
    amount BIGINT NOT NULL,
    c TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS promises (
    b_b TEXT UNIQUE NOT NULL,
    c_b TEXT NOT NULL,
    amount BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS p2sh_scripts (
    address TEXT UNIQUE NOT NULL,
    script TEXT NOT NULL,
    signature TEXT NOT NULL
);
";

pub const POSTGRES_INVOICE_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS invoices (
    hash TEXT PRIMARY KEY,
    amount BIGINT NOT NULL,
    pr TEXT NOT NULL,
    paid BOOLEAN NOT NULL DEFAULT FALSE,
    issued BOOLEAN NOT NULL DEFAULT FALSE,
    time_created BIGINT NOT NULL,
    time_paid BIGINT
);
";
