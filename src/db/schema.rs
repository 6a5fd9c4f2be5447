/// Tables for every resource kind. Locations are keyed by search text, the
/// rest hang off a location id.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_query TEXT NOT NULL UNIQUE,
    formatted_query TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS weathers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    forecast TEXT NOT NULL,
    time TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    location_id INTEGER NOT NULL REFERENCES locations(id)
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link TEXT,
    name TEXT NOT NULL,
    event_date TEXT,
    summary TEXT,
    created_at INTEGER NOT NULL,
    location_id INTEGER NOT NULL REFERENCES locations(id)
);

CREATE TABLE IF NOT EXISTS yelps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    image_url TEXT,
    price TEXT,
    rating REAL,
    url TEXT,
    created_at INTEGER NOT NULL,
    location_id INTEGER NOT NULL REFERENCES locations(id)
);

CREATE TABLE IF NOT EXISTS movies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    overview TEXT,
    average_votes REAL,
    total_votes INTEGER,
    image_url TEXT,
    popularity REAL,
    released_on TEXT,
    created_at INTEGER NOT NULL,
    location_id INTEGER NOT NULL REFERENCES locations(id)
);

CREATE TABLE IF NOT EXISTS trails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    location TEXT,
    length REAL,
    stars REAL,
    star_votes INTEGER,
    summary TEXT,
    trail_url TEXT,
    conditions TEXT,
    condition_date TEXT,
    condition_time TEXT,
    created_at INTEGER NOT NULL,
    location_id INTEGER NOT NULL REFERENCES locations(id)
);

CREATE INDEX IF NOT EXISTS idx_weathers_location ON weathers(location_id);
CREATE INDEX IF NOT EXISTS idx_events_location ON events(location_id);
CREATE INDEX IF NOT EXISTS idx_yelps_location ON yelps(location_id);
CREATE INDEX IF NOT EXISTS idx_movies_location ON movies(location_id);
CREATE INDEX IF NOT EXISTS idx_trails_location ON trails(location_id);
"#;
