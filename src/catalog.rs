// Read-only menu and room catalog

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Single,
    Double,
    Deluxe,
    Suite,
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoomType::Single => "Single",
            RoomType::Double => "Double",
            RoomType::Deluxe => "Deluxe",
            RoomType::Suite => "Suite",
        };
        f.write_str(name)
    }
}

// `available` is informational only. Real availability comes from bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub capacity: u32,
    pub size: u32,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    rooms: Vec<Room>,
    food_items: Vec<FoodItem>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::seeded()
    }
}

impl Catalog {
    pub fn new(rooms: Vec<Room>, food_items: Vec<FoodItem>) -> Self {
        Self { rooms, food_items }
    }

    // The house menu and rooms
    pub fn seeded() -> Self {
        Self::new(seed_rooms(), seed_food_items())
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room_by_id(&self, id: u64) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    pub fn rooms_by_type(&self, room_type: RoomType) -> Vec<&Room> {
        self.rooms
            .iter()
            .filter(|room| room.room_type == room_type)
            .collect()
    }

    // Distinct room types in catalog order
    pub fn room_types(&self) -> Vec<RoomType> {
        let mut types = Vec::new();
        for room in &self.rooms {
            if !types.contains(&room.room_type) {
                types.push(room.room_type);
            }
        }
        types
    }

    pub fn food_items(&self) -> &[FoodItem] {
        &self.food_items
    }

    pub fn food_by_id(&self, id: u64) -> Option<&FoodItem> {
        self.food_items.iter().find(|item| item.id == id)
    }

    pub fn food_by_category(&self, category: &str) -> Vec<&FoodItem> {
        self.food_items
            .iter()
            .filter(|item| item.category == category)
            .collect()
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for item in &self.food_items {
            if !categories.contains(&item.category.as_str()) {
                categories.push(&item.category);
            }
        }
        categories
    }
}

fn unsplash(photo: &str) -> String {
    format!(
        "https://images.unsplash.com/photo-{photo}?ixlib=rb-1.2.1&auto=format&fit=crop&w=800&q=60"
    )
}

fn food(id: u64, name: &str, description: &str, price: f64, category: &str, photo: &str) -> FoodItem {
    FoodItem {
        id,
        name: name.to_string(),
        description: description.to_string(),
        price,
        category: category.to_string(),
        image: unsplash(photo),
    }
}

fn seed_food_items() -> Vec<FoodItem> {
    vec![
        food(1, "Bruschetta", "Grilled bread rubbed with garlic and topped with olive oil, salt, and fresh tomato", 8.99, "Appetizers", "1572695157366-5e585ab2b69f"),
        food(2, "Calamari", "Crispy fried squid served with marinara sauce", 12.99, "Appetizers", "1474222300086-56f8a438e47d"),
        food(3, "Spinach Artichoke Dip", "Creamy blend of spinach, artichokes, and cheese, served with tortilla chips", 10.99, "Appetizers", "1486297678162-eb2a19b0a32d"),
        food(4, "Classic Cheeseburger", "Juicy beef patty with cheddar cheese, lettuce, tomato, and special sauce", 14.99, "Mains", "1568901346375-23c9450c58cd"),
        food(5, "Grilled Salmon", "Fresh salmon fillet grilled to perfection, served with seasonal vegetables", 22.99, "Mains", "1519708227418-c8fd9a32b7a2"),
        food(6, "Fettuccine Alfredo", "Fettuccine pasta in a rich, creamy parmesan sauce", 16.99, "Mains", "1645112411341-6c4fd023714a"),
        food(7, "Margherita Pizza", "Classic pizza with tomato sauce, fresh mozzarella, and basil", 15.99, "Mains", "1574071318508-1cdbab80d002"),
        food(8, "Tiramisu", "Classic Italian dessert with layers of coffee-soaked ladyfingers and mascarpone", 8.99, "Desserts", "1571877227200-a0d98ea607e9"),
        food(9, "Chocolate Lava Cake", "Warm chocolate cake with a molten center, served with vanilla ice cream", 9.99, "Desserts", "1624353365286-3f8d62daad51"),
        food(10, "Freshly Squeezed Orange Juice", "100% pure orange juice, no sugar added", 4.99, "Beverages", "1600271886742-f049cd451bba"),
        food(11, "Iced Coffee", "Cold brewed coffee served over ice", 3.99, "Beverages", "1517701604599-bb29b565090c"),
        food(12, "Strawberry Smoothie", "Blend of fresh strawberries, yogurt, and honey", 5.99, "Beverages", "1553530666-ba11a7da3888"),
    ]
}

#[allow(clippy::too_many_arguments)]
fn room(
    id: u64,
    name: &str,
    description: &str,
    price: f64,
    room_type: RoomType,
    capacity: u32,
    size: u32,
    amenities: &[&str],
    photos: [&str; 2],
) -> Room {
    Room {
        id,
        name: name.to_string(),
        description: description.to_string(),
        price,
        room_type,
        capacity,
        size,
        amenities: amenities.iter().map(|a| a.to_string()).collect(),
        images: photos.iter().map(|p| unsplash(p)).collect(),
        available: true,
    }
}

fn seed_rooms() -> Vec<Room> {
    vec![
        room(
            1,
            "Standard Single Room",
            "Cozy room with a single bed, perfect for solo travelers",
            89.99,
            RoomType::Single,
            1,
            250,
            &["Free Wi-Fi", "TV", "Air conditioning", "Private bathroom", "Desk"],
            ["1512918728675-ed5a9ecdebfd", "1586105251261-72a756497a11"],
        ),
        room(
            2,
            "Classic Double Room",
            "Comfortable room with a queen-sized bed for couples or friends",
            119.99,
            RoomType::Double,
            2,
            350,
            &["Free Wi-Fi", "TV", "Air conditioning", "Private bathroom", "Mini fridge", "Coffee maker"],
            ["1590490360182-c33d57733427", "1566665797739-1674de7a421a"],
        ),
        room(
            3,
            "Deluxe King Room",
            "Spacious room with a king-sized bed and city views",
            159.99,
            RoomType::Deluxe,
            2,
            450,
            &["Free Wi-Fi", "Smart TV", "Air conditioning", "Private bathroom", "Mini fridge", "Coffee maker", "Workspace", "Safe"],
            ["1611892440504-42a792e24d32", "1618773928121-c32242e63f39"],
        ),
        room(
            4,
            "Family Suite",
            "Two-bedroom suite perfect for families, with a living area and kitchenette",
            239.99,
            RoomType::Suite,
            4,
            650,
            &["Free Wi-Fi", "2 Smart TVs", "Air conditioning", "2 Bathrooms", "Kitchenette", "Dining area", "Sofa bed", "Coffee maker", "Safe"],
            ["1582719478250-c89cae4dc85b", "1591088398332-8a7791972843"],
        ),
        room(
            5,
            "Luxury Suite",
            "Our most luxurious accommodation with separate living room and premium amenities",
            329.99,
            RoomType::Suite,
            2,
            750,
            &["Free Wi-Fi", "65\" Smart TV", "Climate control", "Luxury bathroom", "Rainfall shower", "Mini bar", "Espresso machine", "King bed", "Bathrobe & slippers", "Safe", "Turn-down service"],
            ["1578683010236-d716f9a3f461", "1631049552057-a8a160b448b8"],
        ),
    ]
}
