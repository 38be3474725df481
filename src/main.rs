#[rocket::launch]
fn rocket() -> _ {
    geofeed_server::rocket()
}
