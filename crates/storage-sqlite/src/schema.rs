// Hand-maintained to match the table created in `db::init`.

diesel::table! {
    quotes (id) {
        id -> BigInt,
        symbol -> Text,
        price -> Double,
        datetime -> Timestamp,
    }
}
